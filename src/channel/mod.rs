//! Real-time notification channel.
//!
//! A channel keeps one transport alive and ordered on behalf of any number
//! of local listeners.
//!
//! # Architecture
//!
//! ```text
//! subscribe(topic, cb) ──► ListenerRegistry ──► first for topic? ──► Subscribe frame
//!                                                                      │
//!                              ┌───────────────────────────────────────┘
//!                              ▼
//!                   Connecting: OutboundQueue ──(Open: drain)──► Transport
//!                   Ready:      Transport (refresh Heartbeat)
//!
//! Transport ──► Message ──► decode ──► ListenerRegistry::dispatch(topic)
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | [`Channel`] state machine and event pump |
//! | `heartbeat` | Idle heartbeat timer |
//! | `options` | [`ChannelOptions`] |
//! | `queue` | Outbound frame queue |
//! | `registry` | Listener registry and fan-out |

// ============================================================================
// Submodules
// ============================================================================

/// Channel state machine.
pub mod core;

/// Idle heartbeat timer.
pub mod heartbeat;

/// Channel tuning options.
pub mod options;

/// Outbound frame queue.
pub mod queue;

/// Listener registry.
pub mod registry;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::{Channel, ChannelState};
pub use options::{ChannelOptions, DEFAULT_HEARTBEAT_INTERVAL};
pub use registry::{DispatchReport, Listener, ListenerRegistry};
