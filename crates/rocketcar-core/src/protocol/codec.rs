//! JSON codec for the desktop/controller protocol.
//!
//! Frame format (one WebSocket text frame = one event):
//! ```text
//! {"event": "<event-name>", "data": <payload, omitted for payload-less events>}
//! ```
//!
//! Decoding is done in two passes so that a bad frame produces a precise
//! error: first the frame is parsed as a generic JSON object and its
//! `"event"` name is checked against the known names, then the whole object
//! is decoded into the typed [`ClientEvent`].

use serde_json::Value;
use thiserror::Error;

use crate::domain::error::ErrorKind;
use crate::protocol::messages::{ClientEvent, ServerEvent, CLIENT_EVENT_NAMES};

/// Errors that can occur while decoding or encoding a frame.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The frame is not valid JSON.
    #[error("frame is not valid JSON: {0}")]
    NotJson(String),

    /// The frame is JSON but has no string `"event"` field.
    #[error("frame has no \"event\" name")]
    MissingEventName,

    /// The `"event"` name is not part of the protocol.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// The event is known but its `"data"` payload has the wrong shape.
    #[error("malformed payload for '{event}': {reason}")]
    MalformedPayload { event: String, reason: String },

    /// An outbound event could not be serialized.
    #[error("failed to encode '{event}': {reason}")]
    Encode { event: &'static str, reason: String },
}

impl ProtocolError {
    /// Every codec failure is bad input from a peer (or a bug on our side);
    /// none of them is fatal to the connection.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidInput
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decodes one inbound text frame into a [`ClientEvent`].
///
/// # Errors
///
/// Returns [`ProtocolError`] if the frame is not JSON, names no event, names
/// an unknown event, or carries a payload of the wrong shape.
///
/// # Examples
///
/// ```rust
/// use rocketcar_core::protocol::codec::decode_client_event;
/// use rocketcar_core::ClientEvent;
///
/// let event = decode_client_event(r#"{"event":"ping"}"#).unwrap();
/// assert_eq!(event, ClientEvent::Ping);
/// ```
pub fn decode_client_event(frame: &str) -> Result<ClientEvent, ProtocolError> {
    let value: Value =
        serde_json::from_str(frame).map_err(|e| ProtocolError::NotJson(e.to_string()))?;

    let name = value
        .get("event")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingEventName)?
        .to_string();

    if !CLIENT_EVENT_NAMES.contains(&name.as_str()) {
        return Err(ProtocolError::UnknownEvent(name));
    }

    serde_json::from_value(value).map_err(|e| ProtocolError::MalformedPayload {
        event: name,
        reason: e.to_string(),
    })
}

/// Encodes a [`ServerEvent`] into the text of one outbound frame.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.  With the
/// current event set this only happens if a game-state payload contains a
/// value JSON cannot represent, which `serde_json::Value` rules out.
pub fn encode_server_event(event: &ServerEvent) -> Result<String, ProtocolError> {
    serde_json::to_string(event).map_err(|e| ProtocolError::Encode {
        event: event.name(),
        reason: e.to_string(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
