//! Typed message enums.
//!
//! Each direction has its own closed vocabulary. The wire discriminant is the
//! `type` field; see [`super::codec`] for the mapping.

// ============================================================================
// Imports
// ============================================================================

use crate::identifiers::Topic;

// ============================================================================
// ClientMessage
// ============================================================================

/// Control message sent from the client to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMessage {
    /// Ask the server to start pushing events for a topic.
    ///
    /// Sent at most once per topic for the lifetime of a channel.
    Subscribe(Topic),

    /// Liveness ping sent during outbound idle periods.
    Heartbeat,
}

impl ClientMessage {
    /// Returns `true` for heartbeat messages.
    ///
    /// Heartbeats never refresh the idle timer.
    #[inline]
    #[must_use]
    pub const fn is_heartbeat(&self) -> bool {
        matches!(self, Self::Heartbeat)
    }
}

// ============================================================================
// ServerMessage
// ============================================================================

/// Event pushed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMessage {
    /// New data is available for a topic.
    TopicEvent(Topic),
}

impl ServerMessage {
    /// Returns the topic this event belongs to.
    #[inline]
    #[must_use]
    pub const fn topic(&self) -> Topic {
        match self {
            Self::TopicEvent(topic) => *topic,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_heartbeat() {
        assert!(ClientMessage::Heartbeat.is_heartbeat());
        assert!(!ClientMessage::Subscribe(Topic::NewMail).is_heartbeat());
    }

    #[test]
    fn test_server_message_topic() {
        assert_eq!(
            ServerMessage::TopicEvent(Topic::NewMail).topic(),
            Topic::NewMail
        );
    }
}
