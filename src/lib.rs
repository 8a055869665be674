//! Mercury client - real-time new-mail notifications.
//!
//! This library keeps a single WebSocket channel open to a Mercury
//! mail-testing server and fans "new mail available" events out to any
//! number of local listeners.
//!
//! # Architecture
//!
//! The client follows a publish/subscribe model:
//!
//! - **Server**: pushes `{"type":"NewMailAvailable"}` after a topic subscription
//! - **Client (Rust)**: subscribes once per topic, keeps the socket alive with
//!   idle heartbeats, and dispatches events to registered callbacks
//!
//! Key design principles:
//!
//! - Each [`Channel`] owns: one transport + one pump task + one heartbeat timer
//! - Frames written while connecting are queued and flushed in order on open
//! - A closed channel is never revived; [`NotificationClient`] dials a new one
//!   on the next subscribe
//! - A panicking listener never affects the others
//!
//! # Quick Start
//!
//! ```no_run
//! use mercury_client::{NotificationClient, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = NotificationClient::builder()
//!         .origin("http://localhost:8080")
//!         .build()?;
//!
//!     let subscription = client.on_new_mail(|| println!("new mail arrived"));
//!
//!     tokio::signal::ctrl_c().await.ok();
//!     client.unsubscribe(subscription);
//!     client.close();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`channel`] | [`Channel`] state machine, heartbeat, listener registry |
//! | [`client`] | [`NotificationClient`] and its builder |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers and [`Topic`] |
//! | [`mail`] | Mail list items, HTTP fetcher and live [`MailFollower`] |
//! | [`protocol`] | Wire messages and codec |
//! | [`transport`] | Socket seam, WebSocket and in-memory connectors |

// ============================================================================
// Modules
// ============================================================================

/// Notification channel.
///
/// One transport, its outbound queue, heartbeat and listeners.
pub mod channel;

/// Client facade.
///
/// Use [`NotificationClient::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Mail list data.
pub mod mail;

/// WebSocket protocol message types.
pub mod protocol;

/// Transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Channel types
pub use channel::{Channel, ChannelOptions, ChannelState, DEFAULT_HEARTBEAT_INTERVAL};

// Client types
pub use client::{ClientBuilder, NotificationClient, Subscription};

// Error types
pub use error::{DecodeError, Error, Result};

// Identifier types
pub use identifiers::{ChannelId, ListenerId, MailId, Topic};

// Mail types
pub use mail::{
    Address, DisplayMode, EmailPath, Group, HttpMailFetcher, MailFeed, MailFetcher,
    MailFollower, MailListItem, Mailbox,
};

// Transport types
pub use transport::{
    Connector, MemoryConnector, MemoryRemote, Transport, TransportEvent, WsConnector,
};
