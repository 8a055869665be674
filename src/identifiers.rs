//! Type-safe identifiers.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time.
//!
//! | Type | Inner | Issued by |
//! |------|-------|-----------|
//! | [`ListenerId`] | `u64` | `ListenerRegistry` counter |
//! | [`ChannelId`] | `Uuid` | `Channel::open` |
//! | [`MailId`] | `i64` | Mercury server |
//! | [`Topic`] | enum | fixed vocabulary |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// ListenerId
// ============================================================================

/// Handle for one registered callback.
///
/// Monotonically increasing within the registry that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Creates a listener ID from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ChannelId
// ============================================================================

/// Identity of one channel instance.
///
/// A fresh ID is generated every time a channel is (re)constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(Uuid);

impl ChannelId {
    /// Generates a new random channel ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// MailId
// ============================================================================

/// Server-side mail row ID.
///
/// Ordered; the mail list merges and pages by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MailId(i64);

impl MailId {
    /// Creates a mail ID from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MailId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MailId {
    #[inline]
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ============================================================================
// Topic
// ============================================================================

/// Logical event category a listener subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// New mail arrived on the server.
    NewMail,
}

impl Topic {
    /// Returns the topic name used in logs.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NewMail => "new-mail",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_id_ordering() {
        assert!(ListenerId::new(1) < ListenerId::new(2));
        assert_eq!(ListenerId::new(7).as_u64(), 7);
        assert_eq!(ListenerId::new(7).to_string(), "7");
    }

    #[test]
    fn test_channel_ids_are_unique() {
        assert_ne!(ChannelId::generate(), ChannelId::generate());
    }

    #[test]
    fn test_mail_id_serde_transparent() {
        let id: MailId = serde_json::from_str("42").expect("parse");
        assert_eq!(id, MailId::new(42));
        assert_eq!(serde_json::to_string(&id).expect("serialize"), "42");
    }

    #[test]
    fn test_topic_display() {
        assert_eq!(Topic::NewMail.to_string(), "new-mail");
    }
}
