//! Notification client.
//!
//! The [`NotificationClient`] is the sole reconnection point: every
//! subscribe goes through [`NotificationClient::ensure_connection`], which
//! reuses the live channel or dials a new one if the previous channel has
//! closed. There is no background retry.
//!
//! # Example
//!
//! ```no_run
//! use mercury_client::NotificationClient;
//!
//! # async fn example() -> mercury_client::Result<()> {
//! let client = NotificationClient::builder()
//!     .url("ws://localhost:8080/api/listen")
//!     .build()?;
//!
//! client.on_new_mail(|| println!("refetch the mail list"));
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::channel::{Channel, ChannelOptions, Listener};
use crate::identifiers::{ChannelId, ListenerId, Topic};
use crate::transport::Connector;

use super::builder::ClientBuilder;

// ============================================================================
// Subscription
// ============================================================================

/// Opaque handle returned by [`NotificationClient::subscribe`].
///
/// Only useful for [`NotificationClient::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    channel_id: ChannelId,
    listener_id: ListenerId,
}

impl Subscription {
    /// Returns the channel that issued this handle.
    #[inline]
    #[must_use]
    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    /// Returns the listener handle within that channel.
    #[inline]
    #[must_use]
    pub fn listener_id(&self) -> ListenerId {
        self.listener_id
    }
}

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the client.
pub(crate) struct ClientInner {
    /// Dials transports for new channels.
    connector: Arc<dyn Connector>,

    /// Options applied to every channel.
    options: ChannelOptions,

    /// Current channel, possibly closed.
    channel: Mutex<Option<Channel>>,
}

// ============================================================================
// NotificationClient
// ============================================================================

/// Real-time "new mail" notification client.
///
/// Cheap to clone; clones share the same channel.
#[derive(Clone)]
pub struct NotificationClient {
    /// Shared inner state.
    pub(crate) inner: Arc<ClientInner>,
}

impl fmt::Debug for NotificationClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationClient")
            .field("options", &self.inner.options)
            .field("channel", &*self.inner.channel.lock())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// NotificationClient - Constructor
// ============================================================================

impl NotificationClient {
    /// Creates a configuration builder for the client.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client from validated parts. No connection is made yet.
    pub(crate) fn new(connector: Arc<dyn Connector>, options: ChannelOptions) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                connector,
                options,
                channel: Mutex::new(None),
            }),
        }
    }
}

// ============================================================================
// NotificationClient - Public API
// ============================================================================

impl NotificationClient {
    /// Returns the live channel, dialing a new one if there is none or the
    /// current one has closed.
    ///
    /// Must be called within a Tokio runtime. Never blocks on the network.
    pub fn ensure_connection(&self) -> Channel {
        let mut slot = self.inner.channel.lock();

        if let Some(channel) = slot.as_ref()
            && channel.is_open()
        {
            return channel.clone();
        }

        if let Some(previous) = slot.as_ref() {
            debug!(channel_id = %previous.id(), "Previous channel closed, redialing");
        }

        let channel = Channel::spawn(self.inner.connector.as_ref(), &self.inner.options);
        info!(channel_id = %channel.id(), "Opened notification channel");
        *slot = Some(channel.clone());
        channel
    }

    /// Registers `callback` for `topic` on the live channel.
    ///
    /// Returns immediately; the subscribe frame is queued if the socket is
    /// still connecting.
    pub fn subscribe<F>(&self, topic: Topic, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe_with_channel(topic, Arc::new(callback)).0
    }

    /// Registers `listener` and also returns the channel it landed on, so
    /// the caller can watch that channel for closure.
    pub(crate) fn subscribe_with_channel(
        &self,
        topic: Topic,
        listener: Listener,
    ) -> (Subscription, Channel) {
        let channel = self.ensure_connection();
        let listener_id = channel.subscribe_listener(topic, listener);
        let subscription = Subscription {
            channel_id: channel.id(),
            listener_id,
        };
        (subscription, channel)
    }

    /// Registers `callback` for new-mail events.
    #[inline]
    pub fn on_new_mail<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe(Topic::NewMail, callback)
    }

    /// Removes a subscription.
    ///
    /// Handles issued by an earlier, closed channel are ignored. Returns
    /// `true` if a listener was removed.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let slot = self.inner.channel.lock();

        match slot.as_ref() {
            Some(channel) if channel.id() == subscription.channel_id => {
                channel.unsubscribe(subscription.listener_id)
            }
            _ => {
                debug!(
                    channel_id = %subscription.channel_id,
                    listener_id = %subscription.listener_id,
                    "Ignoring unsubscribe for stale channel"
                );
                false
            }
        }
    }

    /// Returns the current channel, if one was ever opened.
    ///
    /// The returned channel may be closed.
    #[must_use]
    pub fn channel(&self) -> Option<Channel> {
        self.inner.channel.lock().clone()
    }

    /// Returns `true` if the current channel is ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner
            .channel
            .lock()
            .as_ref()
            .is_some_and(Channel::is_ready)
    }

    /// Returns the options applied to new channels.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ChannelOptions {
        &self.inner.options
    }

    /// Closes the current channel, if any.
    ///
    /// A later subscribe dials a fresh one.
    pub fn close(&self) {
        if let Some(channel) = self.inner.channel.lock().take() {
            info!(channel_id = %channel.id(), "Closing notification channel");
            channel.close();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
