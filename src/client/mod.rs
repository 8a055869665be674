//! Notification client module.
//!
//! This module provides the entry point used by UI code: it owns at most one
//! live [`Channel`](crate::channel::Channel) and transparently dials a new
//! one when the previous one has closed.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`NotificationClient`] | Subscribe/unsubscribe facade with lazy (re)connection |
//! | [`ClientBuilder`] | Fluent configuration builder |
//! | [`Subscription`] | Handle returned by `subscribe` |
//!
//! # Example
//!
//! ```no_run
//! use mercury_client::{NotificationClient, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = NotificationClient::builder()
//!     .origin("http://localhost:8080")
//!     .build()?;
//!
//! let subscription = client.on_new_mail(|| println!("new mail"));
//! // ...
//! client.unsubscribe(subscription);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for client configuration.
pub mod builder;

/// Core client implementation.
pub mod core;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::{NotificationClient, Subscription};
pub use builder::{ClientBuilder, LISTEN_PATH};
