//! Hub counters.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live hub counters, shared between the hub and its sessions.
#[derive(Debug, Default)]
pub struct HubStats {
    pub connected: AtomicU64,
    pub connections_total: AtomicU64,
    pub disconnects: AtomicU64,
    pub messages_published: AtomicU64,
    pub deliveries: AtomicU64,
    pub invalid_messages: AtomicU64,
    pub dropped: AtomicU64,
}

impl HubStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a client joining.
    pub fn record_connect(&self) {
        self.connected.fetch_add(1, Ordering::Relaxed);
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a client leaving.
    pub fn record_disconnect(&self) {
        self.connected.fetch_sub(1, Ordering::Relaxed);
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one published frame and how many sessions it reached.
    pub fn record_publish(&self, receivers: usize) {
        self.messages_published.fetch_add(1, Ordering::Relaxed);
        self.deliveries
            .fetch_add(receivers as u64, Ordering::Relaxed);
    }

    /// Record a text frame that is not a valid bus message.
    pub fn record_invalid(&self) {
        self.invalid_messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Record frames skipped by a lagging session.
    pub fn record_dropped(&self, count: u64) {
        self.dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HubStatsSnapshot {
        HubStatsSnapshot {
            connected: self.connected.load(Ordering::Relaxed),
            connections_total: self.connections_total.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
            messages_published: self.messages_published.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            invalid_messages: self.invalid_messages.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`HubStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStatsSnapshot {
    pub connected: u64,
    pub connections_total: u64,
    pub disconnects: u64,
    pub messages_published: u64,
    pub deliveries: u64,
    pub invalid_messages: u64,
    pub dropped: u64,
}
