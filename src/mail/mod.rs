//! Mail list data and live following.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`MailListItem`] | One mail list entry with address rendering |
//! | [`EmailPath`] | `Name <address>` splitter |
//! | [`MailFetcher`] / [`HttpMailFetcher`] | Paged access to `GET /api/mail` |
//! | [`MailFeed`] | Ordered, de-duplicated list |
//! | [`MailFollower`] | Keeps a feed current from new-mail notifications |

// ============================================================================
// Submodules
// ============================================================================

/// Ordered mail list.
pub mod feed;

/// HTTP mail list API.
pub mod fetch;

/// Notification-driven refetching.
pub mod follower;

/// List items and addresses.
pub mod item;

// ============================================================================
// Re-exports
// ============================================================================

pub use feed::MailFeed;
pub use fetch::{DEFAULT_PAGE_SIZE, HttpMailFetcher, MailFetcher};
pub use follower::{MailFollower, RESUBSCRIBE_DELAY};
pub use item::{Address, DisplayMode, EmailPath, Group, MailListItem, Mailbox};
