//! Error types for the Mercury client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use mercury_client::{NotificationClient, Result};
//!
//! fn example() -> Result<NotificationClient> {
//!     NotificationClient::builder()
//!         .origin("http://localhost:8080")
//!         .build()
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Decode`] |
//! | Mail API | [`Error::Fetch`] |
//! | External | [`Error::Json`], [`Error::WebSocket`], [`Error::Url`], [`Error::Http`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// DecodeError
// ============================================================================

/// Failure to turn an inbound text frame into a typed message.
///
/// Always recoverable: the frame is logged and dropped, the connection
/// stays open.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Frame is not a JSON object.
    #[error("malformed frame: {message}")]
    Malformed {
        /// Parser message.
        message: String,
    },

    /// Frame has no string `type` field.
    #[error("frame has no type field")]
    MissingType,

    /// Frame carries a `type` this client does not understand.
    #[error("unknown message type: {tag}")]
    UnknownType {
        /// The unrecognized discriminant.
        tag: String,
    },
}

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Transport-level failure.
    ///
    /// Returned when the WebSocket cannot be established or fails mid-stream.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// The transport is gone.
    ///
    /// Returned when writing to a transport whose event loop has stopped.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Inbound frame could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    // ========================================================================
    // Mail API Errors
    // ========================================================================
    /// Mail API answered with a non-success status.
    #[error("Mail API returned {status}: {message}")]
    Fetch {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// URL parse error.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a mail API error.
    #[inline]
    pub fn fetch(status: u16, message: impl Into<String>) -> Self {
        Self::Fetch {
            status,
            message: message.into(),
        }
    }

    /// Creates a malformed-frame decode error.
    #[inline]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Decode(DecodeError::Malformed {
            message: message.into(),
        })
    }

    /// Creates an unknown-message-type decode error.
    #[inline]
    pub fn unknown_type(tag: impl Into<String>) -> Self {
        Self::Decode(DecodeError::UnknownType { tag: tag.into() })
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a frame decode error.
    #[inline]
    #[must_use]
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::Decode(_))
    }

    /// Returns `true` if the frame carried an unrecognized or missing `type`.
    #[inline]
    #[must_use]
    pub fn is_unknown_message_type(&self) -> bool {
        matches!(
            self,
            Self::Decode(DecodeError::UnknownType { .. } | DecodeError::MissingType)
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionClosed | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Decode failures never affect the connection. Mail API failures may
    /// succeed on the next refetch.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::Fetch { .. } | Self::Http(_))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::connection("refused");
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("missing url");
        assert_eq!(err.to_string(), "Configuration error: missing url");
    }

    #[test]
    fn test_decode_error_display() {
        let err = Error::unknown_type("Bogus");
        assert_eq!(err.to_string(), "Decode error: unknown message type: Bogus");

        let err: Error = DecodeError::MissingType.into();
        assert_eq!(err.to_string(), "Decode error: frame has no type field");
    }

    #[test]
    fn test_is_unknown_message_type() {
        assert!(Error::unknown_type("x").is_unknown_message_type());
        assert!(Error::Decode(DecodeError::MissingType).is_unknown_message_type());
        assert!(!Error::malformed("eof").is_unknown_message_type());
        assert!(Error::malformed("eof").is_decode_error());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(!Error::config("test").is_connection_error());
        assert!(!Error::malformed("test").is_connection_error());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::malformed("test").is_recoverable());
        assert!(Error::fetch(500, "boom").is_recoverable());
        assert!(!Error::ConnectionClosed.is_recoverable());
        assert!(!Error::config("test").is_recoverable());
    }

    #[test]
    fn test_fetch_error_display() {
        let err = Error::fetch(404, "not found");
        assert_eq!(err.to_string(), "Mail API returned 404: not found");
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_from_url_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = url_err.into();
        assert!(matches!(err, Error::Url(_)));
    }
}
