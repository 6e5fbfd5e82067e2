//! # OVOS Bus Core - Fan-out Hub for the OpenVoiceOS Message Bus
//!
//! Every connected client gets a [`ClientSession`]; every frame a client
//! sends is published to the [`MessageHub`] and delivered to all sessions,
//! the sender's own session included.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │   Client A   │                    │   Client B   │
//! │              │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!        ↑               ▼                    ↑
//!        │         ┌──────────────┐           │
//!        └──────── │  MessageHub  │ ──────────┘
//!           recv() └──────────────┘  recv()
//! ```
//!
//! Frames are forwarded verbatim. [`BusMessage`] is only used to peek at
//! the Mycroft `type` for logging and to build messages on the client side.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod hub;
pub mod message;
pub mod session;
pub mod stats;

// Re-export main types
pub use hub::{ClientId, ClientInfo, Envelope, MessageHub, MessagePublisher, Payload};
pub use message::{BusMessage, MessageError};
pub use session::ClientSession;
pub use stats::{HubStats, HubStatsSnapshot};

/// Messages buffered per client before a slow client starts losing frames.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
