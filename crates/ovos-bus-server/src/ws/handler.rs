//! WebSocket connection handler.
//!
//! One handler per client. It pumps frames in both directions:
//! - client → hub: every text or binary frame is published unchanged
//! - hub → client: every published frame, the client's own included
//!
//! Message size limits are enforced by the websocket layer before a frame
//! reaches this handler.

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures::{SinkExt, StreamExt};
use ovos_bus_core::{
    BusMessage, ClientId, ClientSession, Envelope, MessageHub, MessagePublisher, Payload,
};
use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Close reason sent to clients when the bus stops.
pub const SHUTDOWN_REASON: &str = "message bus shutting down";

/// WebSocket connection handler
pub struct ConnectionHandler {
    hub: Arc<MessageHub>,
    session: ClientSession,
}

impl ConnectionHandler {
    /// Register a new client with the hub.
    pub fn new(hub: Arc<MessageHub>, peer: Option<SocketAddr>) -> Self {
        let session = hub.connect(peer);
        Self { hub, session }
    }

    pub fn client_id(&self) -> ClientId {
        self.session.id()
    }

    /// Handle a WebSocket connection until either side goes away.
    pub async fn handle(self, socket: WebSocket) {
        let Self { hub, mut session } = self;
        let client_id = session.id();
        let (mut sink, mut stream) = socket.split();

        loop {
            tokio::select! {
                inbound = stream.next() => {
                    let Some(inbound) = inbound else {
                        debug!(client_id = %client_id, "WebSocket stream ended");
                        break;
                    };

                    match inbound {
                        Ok(Message::Text(text)) => forward_text(&hub, client_id, text),
                        Ok(Message::Binary(data)) => {
                            debug!(client_id = %client_id, size = data.len(), "Binary frame received");
                            hub.publish(Envelope::binary(client_id, data));
                        }
                        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                            // Pongs are queued by the websocket layer
                        }
                        Ok(Message::Close(frame)) => {
                            debug!(
                                client_id = %client_id,
                                code = ?frame.as_ref().map(|f| f.code),
                                "WebSocket close received"
                            );
                            break;
                        }
                        Err(e) => {
                            warn!(client_id = %client_id, error = %e, "WebSocket error");
                            break;
                        }
                    }
                }

                outbound = session.recv() => {
                    let Some(envelope) = outbound else {
                        let close = Message::Close(Some(CloseFrame {
                            code: close_code::AWAY,
                            reason: Cow::Borrowed(SHUTDOWN_REASON),
                        }));
                        if let Err(e) = sink.send(close).await {
                            debug!(client_id = %client_id, error = %e, "Failed to send close frame");
                        }
                        break;
                    };

                    if let Err(e) = sink.send(into_ws_message(envelope.payload)).await {
                        debug!(client_id = %client_id, error = %e, "Failed to deliver frame");
                        break;
                    }
                }
            }
        }

        info!(client_id = %client_id, "WebSocket connection closed");
        // Dropping the session removes the client from the hub.
    }
}

/// Publish a text frame, logging its message type when it has one.
fn forward_text(hub: &MessageHub, origin: ClientId, text: String) {
    match BusMessage::peek_type(&text) {
        Some(msg_type) => {
            debug!(client_id = %origin, msg_type = %msg_type, "Message received");
        }
        None => {
            hub.record_invalid();
            debug!(
                client_id = %origin,
                size = text.len(),
                "Forwarding frame that is not a bus message"
            );
        }
    }
    hub.publish(Envelope::text(origin, text));
}

fn into_ws_message(payload: Payload) -> Message {
    match payload {
        Payload::Text(text) => Message::Text(text.to_string()),
        Payload::Binary(data) => Message::Binary(data.to_vec()),
    }
}
