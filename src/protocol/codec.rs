//! Text frame codec.
//!
//! Frames are single JSON objects discriminated by a `type` field:
//!
//! ```json
//! { "type": "NewMailAvailable" }
//! ```
//!
//! Decoding an unknown or missing `type` is a recoverable
//! [`DecodeError`], never a reason to drop the connection.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, from_str, from_value, to_string};

use crate::error::{DecodeError, Result};
use crate::identifiers::Topic;

use super::message::{ClientMessage, ServerMessage};

// ============================================================================
// Wire Representations
// ============================================================================

/// Outbound wire form.
#[derive(Serialize)]
#[serde(tag = "type")]
enum ClientFrame {
    ListenForNewMail,
    Heartbeat,
}

impl From<ClientMessage> for ClientFrame {
    fn from(message: ClientMessage) -> Self {
        match message {
            ClientMessage::Subscribe(Topic::NewMail) => Self::ListenForNewMail,
            ClientMessage::Heartbeat => Self::Heartbeat,
        }
    }
}

/// Inbound wire form.
#[derive(Deserialize)]
#[serde(tag = "type")]
enum ServerFrame {
    NewMailAvailable,
    #[serde(other)]
    Unknown,
}

// ============================================================================
// Encode / Decode
// ============================================================================

/// Encodes a client message into a text frame.
///
/// # Errors
///
/// Returns [`crate::Error::Json`] if serialization fails.
pub fn encode(message: ClientMessage) -> Result<String> {
    Ok(to_string(&ClientFrame::from(message))?)
}

/// Decodes a server text frame.
///
/// # Errors
///
/// - [`DecodeError::Malformed`] if the frame is not JSON
/// - [`DecodeError::MissingType`] if there is no string `type` field
/// - [`DecodeError::UnknownType`] if the `type` is not recognized
pub fn decode(frame: &str) -> std::result::Result<ServerMessage, DecodeError> {
    let value: Value = from_str(frame).map_err(|e| DecodeError::Malformed {
        message: e.to_string(),
    })?;

    let tag = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?
        .to_owned();

    match from_value::<ServerFrame>(value) {
        Ok(ServerFrame::NewMailAvailable) => Ok(ServerMessage::TopicEvent(Topic::NewMail)),
        Ok(ServerFrame::Unknown) | Err(_) => Err(DecodeError::UnknownType { tag }),
    }
}

// ============================================================================
// Tests
// ============================================================================
