//! WebSocket module.
//!
//! Each accepted upgrade on the bus route gets a [`ConnectionHandler`].

pub mod handler;

pub use handler::{ConnectionHandler, SHUTDOWN_REASON};
