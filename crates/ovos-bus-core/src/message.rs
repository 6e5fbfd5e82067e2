//! # Bus Messages
//!
//! The Mycroft message envelope carried over the bus:
//!
//! ```json
//! {"type": "speak", "data": {"utterance": "hello"}, "context": {"source": "skills"}}
//! ```
//!
//! The hub never needs this type to route a frame; it exists for logging
//! and for clients that build and answer messages.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors produced while decoding a bus message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessageError {
    /// The frame is not a JSON object.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// The object has no string `type` field.
    #[error("message has no type")]
    MissingType,
}

/// A Mycroft-style message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    /// Message type, e.g. `recognizer_loop:utterance`.
    #[serde(rename = "type")]
    pub msg_type: String,

    /// Payload.
    #[serde(default = "empty_object")]
    pub data: Value,

    /// Routing metadata (`source`, `destination`, `session`, ...).
    #[serde(default = "empty_object")]
    pub context: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl BusMessage {
    /// Create a message with empty data and context.
    #[must_use]
    pub fn new(msg_type: impl Into<String>) -> Self {
        Self {
            msg_type: msg_type.into(),
            data: empty_object(),
            context: empty_object(),
        }
    }

    /// Replace the data payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Replace the context.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    /// Decode a text frame.
    pub fn parse(text: &str) -> Result<Self, MessageError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| MessageError::Malformed(e.to_string()))?;

        let Value::Object(mut object) = value else {
            return Err(MessageError::Malformed("expected a JSON object".into()));
        };

        let msg_type = match object.remove("type") {
            Some(Value::String(t)) => t,
            _ => return Err(MessageError::MissingType),
        };

        Ok(Self {
            msg_type,
            data: object.remove("data").unwrap_or_else(empty_object),
            context: object.remove("context").unwrap_or_else(empty_object),
        })
    }

    /// Extract only the `type` of a text frame.
    ///
    /// Accepts exactly what [`BusMessage::parse`] accepts: a JSON object
    /// whose `type` is a string.
    #[must_use]
    pub fn peek_type(text: &str) -> Option<String> {
        let object: Map<String, Value> = serde_json::from_str(text).ok()?;
        match object.get("type") {
            Some(Value::String(t)) => Some(t.clone()),
            _ => None,
        }
    }

    /// Encode as a text frame.
    #[must_use]
    pub fn to_json(&self) -> String {
        // A struct of String and Value fields always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Build an answer to this message.
    ///
    /// The context is carried over with `source` and `destination` swapped,
    /// so the answer is routed back to whoever asked.
    #[must_use]
    pub fn reply(&self, msg_type: impl Into<String>, data: Value) -> Self {
        let mut context = match &self.context {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };

        let source = context.remove("source");
        let destination = context.remove("destination");
        if let Some(destination) = destination {
            context.insert("source".into(), destination);
        }
        if let Some(source) = source {
            context.insert("destination".into(), source);
        }

        Self {
            msg_type: msg_type.into(),
            data,
            context: Value::Object(context),
        }
    }
}
