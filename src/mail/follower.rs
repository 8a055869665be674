//! Keeps a [`MailFeed`] current from new-mail notifications.
//!
//! ```text
//! NewMail event ──► Notify (one permit) ──► follower task ──► catch_up()
//!                                                               │
//!                   newest page ──► merge ──► full and all new? ─┴─► next older page
//! ```
//!
//! Events that arrive while a catch-up is running leave a single permit
//! behind, so a burst costs at most one extra catch-up.
//!
//! When the notification channel closes, the follower waits
//! [`RESUBSCRIBE_DELAY`], subscribes again through the client (which dials
//! a fresh channel) and catches up on whatever arrived in between.

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::channel::{Channel, Listener};
use crate::client::{NotificationClient, Subscription};
use crate::error::Result;
use crate::identifiers::{MailId, Topic};

use super::feed::MailFeed;
use super::fetch::{DEFAULT_PAGE_SIZE, MailFetcher};

// ============================================================================
// Constants
// ============================================================================

/// Pause between a channel closing and the follower subscribing again.
pub const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(1);

// ============================================================================
// Types
// ============================================================================

/// State shared with the follower task and the notification callback.
struct FollowerInner {
    fetcher: Arc<dyn MailFetcher>,
    page_size: usize,
    feed: Mutex<MailFeed>,
    wake: Notify,
    revision: watch::Sender<u64>,
    attachment: Mutex<Attachment>,
}

/// Current subscription, guarded together with the stop flag so a
/// resubscribe cannot slip in after [`MailFollower::stop`].
#[derive(Default)]
struct Attachment {
    subscription: Option<Subscription>,
    stopped: bool,
}

// ============================================================================
// MailFollower
// ============================================================================

/// Background mail list follower.
///
/// Survives channel closures by resubscribing. Dropping the follower
/// unsubscribes and stops its task.
pub struct MailFollower {
    inner: Arc<FollowerInner>,
    client: NotificationClient,
    task: Option<JoinHandle<()>>,
}

impl MailFollower {
    /// Starts following with the default page size.
    ///
    /// Must be called within a Tokio runtime.
    pub fn start(client: &NotificationClient, fetcher: Arc<dyn MailFetcher>) -> Self {
        Self::start_with_page_size(client, fetcher, DEFAULT_PAGE_SIZE)
    }

    /// Starts following with the given page size (at least 1).
    pub fn start_with_page_size(
        client: &NotificationClient,
        fetcher: Arc<dyn MailFetcher>,
        page_size: usize,
    ) -> Self {
        let (revision, _) = watch::channel(0);
        let inner = Arc::new(FollowerInner {
            fetcher,
            page_size: page_size.max(1),
            feed: Mutex::new(MailFeed::new()),
            wake: Notify::new(),
            revision,
            attachment: Mutex::new(Attachment::default()),
        });

        let task = inner.attach(client).map(|channel| {
            // Initial load
            inner.wake.notify_one();
            tokio::spawn(run_follower(Arc::clone(&inner), client.clone(), channel))
        });

        debug!(page_size = inner.page_size, "Mail follower started");

        Self {
            inner,
            client: client.clone(),
            task,
        }
    }

    /// Returns a receiver whose value increases on every feed change.
    #[must_use]
    pub fn updates(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Returns a copy of the current feed.
    #[must_use]
    pub fn snapshot(&self) -> MailFeed {
        self.inner.feed.lock().clone()
    }

    /// Runs `f` against the current feed without copying it.
    pub fn with_feed<R>(&self, f: impl FnOnce(&MailFeed) -> R) -> R {
        f(&self.inner.feed.lock())
    }

    /// Fetches the page below the oldest known item.
    ///
    /// Returns the number of new items.
    ///
    /// # Errors
    ///
    /// Returns the fetcher's error.
    pub async fn load_older(&self) -> Result<usize> {
        let before = self.inner.feed.lock().oldest_id();
        self.inner.fetch_and_merge(before).await.map(|(added, _)| added)
    }

    /// Triggers a catch-up without waiting for a notification.
    pub fn refresh(&self) {
        self.inner.wake.notify_one();
    }

    /// Unsubscribes and stops the task. Idempotent.
    pub fn stop(&mut self) {
        let subscription = {
            let mut attachment = self.inner.attachment.lock();
            attachment.stopped = true;
            attachment.subscription.take()
        };
        if let Some(subscription) = subscription {
            self.client.unsubscribe(subscription);
        }
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Mail follower stopped");
        }
    }

    /// Returns `true` until [`MailFollower::stop`] is called.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for MailFollower {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// Subscription
// ============================================================================

impl FollowerInner {
    /// Subscribes to new-mail events on the client's live channel.
    ///
    /// Returns that channel, or `None` once the follower is stopped.
    fn attach(self: &Arc<Self>, client: &NotificationClient) -> Option<Channel> {
        let mut attachment = self.attachment.lock();
        if attachment.stopped {
            return None;
        }

        let (subscription, channel) =
            client.subscribe_with_channel(Topic::NewMail, wake_listener(Arc::downgrade(self)));
        attachment.subscription = Some(subscription);
        Some(channel)
    }
}

/// Listener that wakes the follower task, if it is still around.
fn wake_listener(inner: Weak<FollowerInner>) -> Listener {
    Arc::new(move || {
        if let Some(inner) = inner.upgrade() {
            inner.wake.notify_one();
        }
    })
}

// ============================================================================
// Catch-up
// ============================================================================

impl FollowerInner {
    /// Fetches one page, merges it and bumps the revision.
    ///
    /// Returns `(new items, page items)`.
    async fn fetch_and_merge(&self, before: Option<MailId>) -> Result<(usize, Vec<MailId>)> {
        let page = self.fetcher.fetch_page(before, self.page_size).await?;
        let ids: Vec<_> = page.iter().map(|item| item.id).collect();

        let added = self.feed.lock().merge(page);
        if added > 0 {
            self.revision.send_modify(|revision| *revision += 1);
        }

        Ok((added, ids))
    }

    /// Pulls the newest page, then older pages while they are entirely new.
    ///
    /// An empty feed only loads the newest page.
    async fn catch_up(&self) -> Result<usize> {
        let filling_gap = !self.feed.lock().is_empty();
        let mut before = None;
        let mut total = 0;

        loop {
            let (added, ids) = self.fetch_and_merge(before).await?;
            total += added;

            let page_full = ids.len() == self.page_size;
            match ids.iter().min() {
                Some(&oldest) if filling_gap && page_full && added == ids.len() => {
                    before = Some(oldest);
                }
                _ => break,
            }
        }

        Ok(total)
    }
}

/// Catches up after each wake-up and resubscribes when `channel` closes.
async fn run_follower(
    inner: Arc<FollowerInner>,
    client: NotificationClient,
    mut channel: Channel,
) {
    loop {
        tokio::select! {
            () = inner.wake.notified() => {
                match inner.catch_up().await {
                    Ok(added) => debug!(added, "Mail list caught up"),
                    Err(e) => warn!(error = %e, "Mail list catch-up failed"),
                }
            }
            () = channel.closed() => {
                debug!(channel_id = %channel.id(), "Notification channel closed");
                sleep(RESUBSCRIBE_DELAY).await;

                let Some(next) = inner.attach(&client) else {
                    return;
                };
                info!(channel_id = %next.id(), "Mail follower resubscribed");
                channel = next;

                // Mail may have arrived while detached
                inner.wake.notify_one();
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
