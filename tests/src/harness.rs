//! # Test Harness
//!
//! Runs a real bus on `127.0.0.1:0` and hands out websocket clients.
//! Every await is bounded so a broken flow fails instead of hanging.

use futures_util::{SinkExt, StreamExt};
use ovos_bus_core::MessageHub;
use ovos_bus_server::{BusConfig, BusError, MessageBusService};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Upper bound for any single step of a test.
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A message bus serving in the background.
pub struct TestBus {
    pub url: String,
    pub hub: Arc<MessageHub>,
    shutdown: Option<oneshot::Sender<()>>,
    server: JoinHandle<Result<(), BusError>>,
}

impl TestBus {
    /// Start with default settings on an ephemeral port.
    pub async fn start() -> Self {
        Self::start_with(BusConfig::default()).await
    }

    /// Start with `config`, overriding only the port.
    pub async fn start_with(config: BusConfig) -> Self {
        let config = BusConfig { port: 0, ..config };
        let bound = MessageBusService::new(config)
            .expect("valid config")
            .bind()
            .await
            .expect("bind");

        let url = bound.endpoint();
        let hub = bound.hub();
        let (tx, rx) = oneshot::channel::<()>();
        let server = tokio::spawn(bound.serve(async move {
            let _ = rx.await;
        }));

        Self {
            url,
            hub,
            shutdown: Some(tx),
            server,
        }
    }

    /// Connect a client and wait until the hub has registered it.
    pub async fn connect(&self) -> Client {
        let expected = self.hub.client_count() + 1;
        let client = self.connect_url(&self.url).await.expect("connect");
        self.wait_for_clients(expected).await;
        client
    }

    /// Connect to an arbitrary URL on this server.
    pub async fn connect_url(&self, url: &str) -> Result<Client, String> {
        match timeout(STEP_TIMEOUT, connect_async(url)).await {
            Ok(Ok((client, _response))) => Ok(client),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err("connect timed out".to_string()),
        }
    }

    /// Wait until exactly `count` clients are registered.
    pub async fn wait_for_clients(&self, count: usize) {
        let hub = Arc::clone(&self.hub);
        timeout(STEP_TIMEOUT, async move {
            while hub.client_count() != count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| {
            panic!(
                "expected {} clients, hub has {}",
                count,
                self.hub.client_count()
            )
        });
    }

    /// Signal shutdown and wait for the server task to finish.
    pub async fn shutdown(mut self) -> Result<(), BusError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        timeout(STEP_TIMEOUT * 2, self.server)
            .await
            .expect("server stops")
            .expect("server task")
    }
}

/// Next data or close frame, skipping pings and pongs.
pub async fn next_frame(client: &mut Client) -> Option<Message> {
    loop {
        let frame = timeout(STEP_TIMEOUT, client.next())
            .await
            .expect("frame timeout");
        match frame {
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
            Some(Ok(message)) => return Some(message),
            Some(Err(_)) | None => return None,
        }
    }
}

/// Next text frame; panics on anything else.
pub async fn next_text(client: &mut Client) -> String {
    match next_frame(client).await {
        Some(Message::Text(text)) => text.as_str().to_owned(),
        other => panic!("expected text frame, got {:?}", other),
    }
}

pub async fn send_text(client: &mut Client, text: &str) {
    timeout(STEP_TIMEOUT, client.send(Message::text(text)))
        .await
        .expect("send timeout")
        .expect("send");
}

/// A Mycroft style message as the clients on the bus produce them.
pub fn bus_message(msg_type: &str, utterance: &str) -> String {
    serde_json::json!({
        "type": msg_type,
        "data": {"utterance": utterance},
        "context": {"source": "tests"},
    })
    .to_string()
}
