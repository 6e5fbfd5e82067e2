//! # Client Sessions
//!
//! The receiving side of the hub. One session per connected client.

use crate::hub::{ClientId, ClientRegistry, Envelope};
use crate::stats::HubStats;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

/// A connected client's view of the hub.
///
/// When dropped, the client is removed from the registry.
pub struct ClientSession {
    id: ClientId,

    peer: Option<SocketAddr>,

    /// The broadcast receiver.
    receiver: broadcast::Receiver<Envelope>,

    /// Hub shutdown flag.
    shutdown: watch::Receiver<bool>,

    /// Reference to the registry (for cleanup).
    clients: ClientRegistry,

    stats: Arc<HubStats>,
}

impl ClientSession {
    pub(crate) fn new(
        id: ClientId,
        peer: Option<SocketAddr>,
        receiver: broadcast::Receiver<Envelope>,
        shutdown: watch::Receiver<bool>,
        clients: ClientRegistry,
        stats: Arc<HubStats>,
    ) -> Self {
        Self {
            id,
            peer,
            receiver,
            shutdown,
            clients,
            stats,
        }
    }

    #[must_use]
    pub fn id(&self) -> ClientId {
        self.id
    }

    #[must_use]
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Receive the next frame published to the hub.
    ///
    /// # Returns
    ///
    /// - `Some(envelope)` - The next frame
    /// - `None` - The hub was closed
    ///
    /// Cancel safe: a frame is never lost when this future is dropped
    /// before completion.
    pub async fn recv(&mut self) -> Option<Envelope> {
        loop {
            if *self.shutdown.borrow() {
                return None;
            }

            tokio::select! {
                biased;

                _ = self.shutdown.wait_for(|closed| *closed) => return None,

                result = self.receiver.recv() => match result {
                    Ok(envelope) => return Some(envelope),
                    Err(broadcast::error::RecvError::Closed) => return None,
                    Err(broadcast::error::RecvError::Lagged(count)) => {
                        self.stats.record_dropped(count);
                        warn!(
                            client_id = %self.id,
                            skipped = count,
                            "Client lagged, frames dropped"
                        );
                    }
                },
            }
        }
    }

    /// Resolve once the hub is closed.
    pub async fn closed(&mut self) {
        // An error means the hub itself is gone, which counts as closed.
        let _ = self.shutdown.wait_for(|closed| *closed).await;
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        if let Ok(mut clients) = self.clients.write() {
            clients.remove(&self.id);
        }
        self.stats.record_disconnect();
        info!(client_id = %self.id, peer = ?self.peer, "Client disconnected");
    }
}
