//! # Message Hub
//!
//! The publishing side of the bus and the registry of connected clients.

use crate::session::ClientSession;
use crate::stats::{HubStats, HubStatsSnapshot};
use crate::DEFAULT_CHANNEL_CAPACITY;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

/// Identifier assigned to a client when it connects.
///
/// Ids increase monotonically and are never reused within one hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry entry for a connected client.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub id: ClientId,
    /// Remote address, when known.
    pub peer: Option<SocketAddr>,
    pub connected_at: SystemTime,
}

/// A frame as received from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(Arc<str>),
    Binary(Bytes),
}

impl Payload {
    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Payload::Text(text) => text.len(),
            Payload::Binary(data) => data.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The text of a text frame.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Binary(_) => None,
        }
    }
}

/// A published frame tagged with the client that sent it.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub origin: ClientId,
    pub payload: Payload,
}

impl Envelope {
    pub fn text(origin: ClientId, text: impl Into<Arc<str>>) -> Self {
        Self {
            origin,
            payload: Payload::Text(text.into()),
        }
    }

    pub fn binary(origin: ClientId, data: impl Into<Bytes>) -> Self {
        Self {
            origin,
            payload: Payload::Binary(data.into()),
        }
    }
}

/// Anything frames can be published to.
pub trait MessagePublisher: Send + Sync {
    /// Publish a frame to every connected client.
    ///
    /// # Returns
    ///
    /// The number of sessions the frame was queued for.
    fn publish(&self, envelope: Envelope) -> usize;

    /// Total frames published so far.
    fn messages_published(&self) -> u64;
}

pub(crate) type ClientRegistry = Arc<RwLock<HashMap<ClientId, ClientInfo>>>;

/// In-memory fan-out hub.
///
/// Uses `tokio::sync::broadcast`, so each frame is stored once and cloned
/// lazily per session. A session that falls more than `capacity` frames
/// behind skips the oldest ones.
pub struct MessageHub {
    /// Broadcast sender shared by all publishers.
    sender: broadcast::Sender<Envelope>,

    /// Flips to `true` once when the hub closes.
    shutdown: watch::Sender<bool>,

    /// Connected clients.
    clients: ClientRegistry,

    stats: Arc<HubStats>,

    next_id: AtomicU64,

    capacity: usize,
}

impl MessageHub {
    /// Create a hub with the default per-client buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a hub buffering up to `capacity` frames per client.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        let (shutdown, _) = watch::channel(false);
        Self {
            sender,
            shutdown,
            clients: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(HubStats::new()),
            next_id: AtomicU64::new(1),
            capacity,
        }
    }

    /// Register a new client.
    ///
    /// The session receives every frame published from now on, including
    /// the ones it publishes itself.
    #[must_use]
    pub fn connect(&self, peer: Option<SocketAddr>) -> ClientSession {
        let id = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let receiver = self.sender.subscribe();

        if let Ok(mut clients) = self.clients.write() {
            clients.insert(
                id,
                ClientInfo {
                    id,
                    peer,
                    connected_at: SystemTime::now(),
                },
            );
        }
        self.stats.record_connect();

        info!(client_id = %id, peer = ?peer, "Client connected");

        ClientSession::new(
            id,
            peer,
            receiver,
            self.shutdown.subscribe(),
            Arc::clone(&self.clients),
            Arc::clone(&self.stats),
        )
    }

    /// Number of connected clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Connected clients ordered by id.
    #[must_use]
    pub fn clients(&self) -> Vec<ClientInfo> {
        let mut clients: Vec<ClientInfo> = self
            .clients
            .read()
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default();
        clients.sort_by_key(|c| c.id);
        clients
    }

    /// Per-client buffer size.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn stats(&self) -> HubStatsSnapshot {
        self.stats.snapshot()
    }

    /// Count a text frame that did not decode as a bus message.
    pub fn record_invalid(&self) {
        self.stats.record_invalid();
    }

    /// Close the hub. Every session stops receiving.
    pub fn close(&self) {
        let was_closed = self.shutdown.send_replace(true);
        if !was_closed {
            info!(clients = self.client_count(), "Message hub closed");
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }
}

impl Default for MessageHub {
    fn default() -> Self {
        Self::new()
    }
}

impl MessagePublisher for MessageHub {
    fn publish(&self, envelope: Envelope) -> usize {
        if self.is_closed() {
            debug!(origin = %envelope.origin, "Frame dropped (hub closed)");
            return 0;
        }

        let origin = envelope.origin;
        let size = envelope.payload.len();

        let receivers = match self.sender.send(envelope) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!(origin = %origin, "Frame dropped (no receivers)");
                0
            }
        };
        self.stats.record_publish(receivers);

        debug!(
            origin = %origin,
            size = size,
            receivers = receivers,
            "Frame published"
        );
        receivers
    }

    fn messages_published(&self) -> u64 {
        self.stats.snapshot().messages_published
    }
}
