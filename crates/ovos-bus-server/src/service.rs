//! Message bus service - binds the listener and serves the bus route.
//!
//! Plain `ws://` is served by `axum::serve`; `wss://` by `axum-server`
//! with rustls. Either way shutdown closes the hub first, so every client
//! gets a close frame before the process exits.

use crate::domain::config::{format_endpoint, BusConfig};
use crate::domain::error::BusError;
use crate::ws::ConnectionHandler;
use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use ovos_bus_core::{HubStatsSnapshot, MessageHub};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How long connected clients get to receive their close frame.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Message bus service
pub struct MessageBusService {
    config: BusConfig,
    hub: Arc<MessageHub>,
}

impl MessageBusService {
    /// Create a new service. Fails if the configuration is invalid.
    pub fn new(config: BusConfig) -> Result<Self, BusError> {
        config.validate()?;

        let hub = Arc::new(MessageHub::with_capacity(config.channel_capacity));

        Ok(Self { config, hub })
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    pub fn hub(&self) -> Arc<MessageHub> {
        Arc::clone(&self.hub)
    }

    /// Build the router: a single websocket route, everything else is 404.
    pub fn router(&self) -> Router {
        let state = BusState {
            hub: Arc::clone(&self.hub),
            max_message_bytes: self.config.max_message_bytes(),
        };

        Router::new()
            .route(&self.config.route, get(websocket_upgrade))
            .with_state(state)
    }

    /// Bind the listener and, with `ssl`, load the certificate.
    pub async fn bind(self) -> Result<BoundBus, BusError> {
        let tls = if self.config.ssl {
            Some(load_tls(&self.config).await?)
        } else {
            None
        };

        let host = self.config.host.as_str();
        let listener = TcpListener::bind((host, self.config.port))
            .await
            .map_err(|e| BusError::Bind(format!("{}:{}: {}", host, self.config.port, e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| BusError::Bind(e.to_string()))?;

        info!(
            addr = %local_addr,
            route = %self.config.route,
            tls = tls.is_some(),
            "Message bus listening"
        );

        Ok(BoundBus {
            router: self.router(),
            listener,
            local_addr,
            tls,
            scheme: self.config.scheme(),
            route: self.config.route,
            hub: self.hub,
        })
    }

    /// Serve until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<HubStatsSnapshot, BusError> {
        let bound = self.bind().await?;
        let hub = bound.hub();
        bound.serve(shutdown_signal()).await?;
        Ok(hub.stats())
    }
}

/// A bound, not yet serving, message bus.
pub struct BoundBus {
    router: Router,
    listener: TcpListener,
    local_addr: SocketAddr,
    tls: Option<RustlsConfig>,
    scheme: &'static str,
    route: String,
    hub: Arc<MessageHub>,
}

impl BoundBus {
    /// Address actually bound, useful with port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// URL clients should connect to.
    pub fn endpoint(&self) -> String {
        format_endpoint(
            self.scheme,
            &self.local_addr.ip().to_string(),
            self.local_addr.port(),
            &self.route,
        )
    }

    pub fn hub(&self) -> Arc<MessageHub> {
        Arc::clone(&self.hub)
    }

    /// Serve until `shutdown` resolves, then close the hub and drain.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), BusError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let hub = Arc::clone(&self.hub);
        let make_service = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        match self.tls {
            None => {
                let signal_hub = Arc::clone(&hub);
                axum::serve(self.listener, make_service)
                    .with_graceful_shutdown(async move {
                        shutdown.await;
                        signal_hub.close();
                    })
                    .await
                    .map_err(|e| BusError::Serve(e.to_string()))?;
            }
            Some(tls) => {
                let handle = axum_server::Handle::new();
                let _watcher = ShutdownWatcher::spawn(shutdown, Arc::clone(&hub), handle.clone());

                let listener = self
                    .listener
                    .into_std()
                    .map_err(|e| BusError::Serve(e.to_string()))?;
                axum_server::from_tcp_rustls(listener, tls)
                    .handle(handle)
                    .serve(make_service)
                    .await
                    .map_err(|e| BusError::Serve(e.to_string()))?;
            }
        }

        drain(&hub, DRAIN_TIMEOUT).await;
        info!(stats = ?hub.stats(), "Message bus stopped");
        Ok(())
    }
}

/// Waits for the shutdown future of a TLS server, then closes the hub and
/// stops the server. The task is aborted when the watcher is dropped, so
/// the shutdown future never outlives `serve`.
struct ShutdownWatcher(JoinHandle<()>);

impl ShutdownWatcher {
    fn spawn<F>(shutdown: F, hub: Arc<MessageHub>, handle: axum_server::Handle) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self(tokio::spawn(async move {
            shutdown.await;
            hub.close();
            handle.graceful_shutdown(Some(DRAIN_TIMEOUT));
        }))
    }
}

impl Drop for ShutdownWatcher {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Application state shared across handlers
#[derive(Clone)]
struct BusState {
    hub: Arc<MessageHub>,
    max_message_bytes: usize,
}

/// Accept a websocket upgrade on the bus route.
async fn websocket_upgrade(
    ws: WebSocketUpgrade,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    State(state): State<BusState>,
) -> impl IntoResponse {
    let peer = connect_info.map(|ConnectInfo(addr)| addr);
    debug!(peer = ?peer, "WebSocket upgrade requested");

    ws.max_message_size(state.max_message_bytes)
        .max_frame_size(state.max_message_bytes)
        .on_upgrade(move |socket| async move {
            ConnectionHandler::new(state.hub, peer).handle(socket).await;
        })
}

async fn load_tls(config: &BusConfig) -> Result<RustlsConfig, BusError> {
    let (Some(cert), Some(key)) = (&config.ssl_cert, &config.ssl_key) else {
        return Err(BusError::Tls("ssl_cert and ssl_key are required".into()));
    };

    RustlsConfig::from_pem_file(cert, key)
        .await
        .map_err(|e| BusError::Tls(format!("{} / {}: {}", cert.display(), key.display(), e)))
}

/// Wait for handlers to finish sending close frames.
async fn drain(hub: &MessageHub, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    let mut interval = tokio::time::interval(Duration::from_millis(20));

    while hub.client_count() > 0 {
        if tokio::time::Instant::now() >= deadline {
            warn!(
                clients = hub.client_count(),
                "Clients still connected after drain timeout"
            );
            return;
        }
        interval.tick().await;
    }
}

/// Resolve on Ctrl+C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
