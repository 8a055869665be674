//! Transport layer.
//!
//! This module defines the seam between a [`Channel`](crate::channel::Channel)
//! and the socket it owns.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   send(frame) / close()    ┌─────────────────┐
//! │                 │───────────────────────────►│                 │
//! │     Channel     │                            │    Transport    │◄──► Mercury
//! │   (pump task)   │◄───────────────────────────│  (socket task)  │     server
//! └─────────────────┘   TransportEvent stream    └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. [`Connector::connect`] returns a [`Transport`] immediately
//! 2. Dialing happens in the background
//! 3. [`TransportEvent::Open`] once the socket is usable
//! 4. [`TransportEvent::Message`] for every inbound text frame
//! 5. [`TransportEvent::Close`] or [`TransportEvent::Error`], then nothing
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket connector and event loop |
//! | `memory` | In-memory loopback connector |

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;

use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connector and event loop.
pub mod connection;

/// In-memory loopback connector.
pub mod memory;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::WsConnector;
pub use memory::{MemoryConnector, MemoryRemote};

// ============================================================================
// Types
// ============================================================================

/// Lifecycle and data notifications from a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Socket is connected and writable.
    Open,
    /// Inbound text frame.
    Message(String),
    /// Socket closed, gracefully or not.
    Close(Option<String>),
    /// Socket-level failure.
    Error(String),
}

/// Sending half handed to a [`Connector`].
pub type EventSender = mpsc::UnboundedSender<TransportEvent>;

/// Receiving half consumed by the channel's pump task.
pub type EventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

// ============================================================================
// Traits
// ============================================================================

/// Write side of an established (or establishing) socket.
///
/// Both methods are non-blocking.
pub trait Transport: Send + Sync {
    /// Queues a text frame for writing.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ConnectionClosed`] if the socket is gone.
    fn send(&self, frame: String) -> Result<()>;

    /// Requests the socket to close.
    fn close(&self);
}

/// Factory that dials a new transport.
pub trait Connector: Send + Sync {
    /// Starts dialing and returns the transport handle at once.
    ///
    /// Lifecycle is reported through `events`.
    fn connect(&self, events: EventSender) -> Box<dyn Transport>;
}
