//! WebSocket protocol message types.
//!
//! This module defines the frames exchanged with the Mercury server on the
//! notification socket.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Wire form |
//! |---------|-----------|-----------|
//! | [`ClientMessage::Subscribe`] | Client → Server | `{"type":"ListenForNewMail"}` |
//! | [`ClientMessage::Heartbeat`] | Client → Server | `{"type":"Heartbeat"}` |
//! | [`ServerMessage::TopicEvent`] | Server → Client | `{"type":"NewMailAvailable"}` |
//!
//! There is no request/response correlation: subscriptions are
//! fire-and-forget and the server only pushes events.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | Typed message enums per direction |
//! | `codec` | Text frame encoding and decoding |

// ============================================================================
// Submodules
// ============================================================================

/// Typed message enums.
pub mod message;

/// Text frame codec.
pub mod codec;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::{decode, encode};
pub use message::{ClientMessage, ServerMessage};
