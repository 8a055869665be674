//! Channel state machine.
//!
//! A [`Channel`] owns one transport, its outbound queue, its heartbeat
//! timer and its listener registry.
//!
//! # States
//!
//! | State | Entered when | Exits to | On exit |
//! |-------|--------------|----------|---------|
//! | `Connecting` | channel opened | `Ready`, `Closed` | - |
//! | `Ready` | transport `Open` event | `Closed` | drain queue, start heartbeat |
//! | `Closed` | transport `Close`/`Error`, or [`Channel::close`] | (terminal) | stop heartbeat, forget topics, drop queue |
//!
//! # Concurrency
//!
//! Transport events are handled by a single pump task per channel, so no two
//! handlers run at once. Callers may subscribe from any task; the state,
//! queue, subscribed topics and heartbeat sit behind one mutex, and every
//! transport write happens while holding it, which keeps frames in
//! enqueue order.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{ChannelId, ListenerId, Topic};
use crate::protocol::{ClientMessage, decode, encode};
use crate::transport::{Connector, EventReceiver, Transport, TransportEvent};

use super::heartbeat::Heartbeat;
use super::options::ChannelOptions;
use super::queue::OutboundQueue;
use super::registry::{DispatchReport, Listener, ListenerRegistry};

// ============================================================================
// ChannelState
// ============================================================================

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Transport dial in progress; sends are queued.
    Connecting,
    /// Transport open; sends go straight out.
    Ready,
    /// Terminal; sends are dropped.
    Closed,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Types
// ============================================================================

/// Fields that must change together.
struct Shared {
    state: ChannelState,
    queue: OutboundQueue,
    /// Topics whose subscribe frame has been sent or queued.
    subscribed_topics: FxHashSet<Topic>,
    heartbeat: Heartbeat,
}

/// Internal shared state for a channel.
struct ChannelInner {
    id: ChannelId,
    transport: Box<dyn Transport>,
    shared: Mutex<Shared>,
    registry: ListenerRegistry,
    /// Flips to `true` on teardown.
    closed_tx: watch::Sender<bool>,
}

// ============================================================================
// Channel
// ============================================================================

/// Real-time notification channel over one transport.
///
/// Cheap to clone; clones share the same connection. The transport is
/// released when the last clone is dropped.
///
/// # Example
///
/// ```ignore
/// let channel = Channel::open(&connector, &ChannelOptions::default())?;
/// let listener = channel.subscribe(Topic::NewMail, || println!("new mail"));
/// // ...
/// channel.unsubscribe(listener);
/// ```
#[derive(Clone)]
pub struct Channel {
    inner: Arc<ChannelInner>,
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

// ============================================================================
// Channel - Constructor
// ============================================================================

impl Channel {
    /// Dials a new transport and returns the channel in `Connecting` state.
    ///
    /// Spawns the event pump task, so it must be called within a Tokio
    /// runtime. Never blocks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the options are invalid.
    pub fn open(connector: &dyn Connector, options: &ChannelOptions) -> Result<Self> {
        options.validate().map_err(Error::config)?;
        Ok(Self::spawn(connector, options))
    }

    /// Same as [`Channel::open`] for options that were validated already.
    pub(crate) fn spawn(connector: &dyn Connector, options: &ChannelOptions) -> Self {
        let id = ChannelId::generate();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let transport = connector.connect(events_tx);

        let inner = Arc::new(ChannelInner {
            id,
            transport,
            shared: Mutex::new(Shared {
                state: ChannelState::Connecting,
                queue: OutboundQueue::new(),
                subscribed_topics: FxHashSet::default(),
                heartbeat: Heartbeat::new(options.heartbeat_interval),
            }),
            registry: ListenerRegistry::new(),
            closed_tx: watch::channel(false).0,
        });

        tokio::spawn(run_pump(Arc::downgrade(&inner), events_rx));

        debug!(channel_id = %id, "Channel connecting");

        Self { inner }
    }
}

// ============================================================================
// Channel - Public API
// ============================================================================

impl Channel {
    /// Registers a callback for `topic`.
    ///
    /// The first registration for a topic also sends (or queues) the
    /// server-side subscribe frame. Never blocks.
    pub fn subscribe<F>(&self, topic: Topic, callback: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe_listener(topic, Arc::new(callback))
    }

    /// Registers an already shared callback for `topic`.
    ///
    /// On a closed channel nothing is registered and the returned handle
    /// refers to no listener.
    pub fn subscribe_listener(&self, topic: Topic, listener: Listener) -> ListenerId {
        let mut shared = self.inner.shared.lock();
        if shared.state == ChannelState::Closed {
            debug!(channel_id = %self.inner.id, %topic, "Ignoring subscribe on closed channel");
            return self.inner.registry.reserve();
        }

        let listener_id = self.inner.registry.register(topic, listener);
        if shared.subscribed_topics.insert(topic) {
            debug!(channel_id = %self.inner.id, %topic, "Subscribing to topic");
            self.inner
                .enqueue_or_send(&mut shared, ClientMessage::Subscribe(topic));
        }

        listener_id
    }

    /// Removes a callback. Unknown handles are ignored.
    ///
    /// The server-side subscription stays in place even when the last
    /// listener for a topic goes away.
    pub fn unsubscribe(&self, listener_id: ListenerId) -> bool {
        self.inner.registry.unregister(listener_id)
    }

    /// Closes the channel locally.
    ///
    /// Same terminal transition as a transport close. Queued frames are
    /// dropped.
    pub fn close(&self) {
        if self.inner.teardown("closed locally") {
            self.inner.transport.close();
        }
    }

    /// Resolves once the channel is closed.
    ///
    /// Resolves immediately if it already is.
    pub async fn closed(&self) {
        let mut closed_rx = self.inner.closed_tx.subscribe();
        let _ = closed_rx.wait_for(|closed| *closed).await;
    }

    /// Returns the channel ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ChannelId {
        self.inner.id
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ChannelState {
        self.inner.shared.lock().state
    }

    /// Returns `true` once the transport is open and until it closes.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == ChannelState::Ready
    }

    /// Returns `true` until the channel is closed.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() != ChannelState::Closed
    }

    /// Returns the number of registered listeners.
    #[inline]
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Returns the number of frames waiting for the transport to open.
    #[inline]
    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.inner.shared.lock().queue.len()
    }

    /// Returns `true` if a heartbeat timer is pending.
    #[inline]
    #[must_use]
    pub fn heartbeat_running(&self) -> bool {
        self.inner.shared.lock().heartbeat.is_running()
    }
}

// ============================================================================
// ChannelInner - Sending
// ============================================================================

impl ChannelInner {
    /// Writes a message now if ready, queues it if connecting, drops it if
    /// closed.
    fn enqueue_or_send(&self, shared: &mut Shared, message: ClientMessage) {
        let frame = match encode(message) {
            Ok(frame) => frame,
            Err(e) => {
                error!(channel_id = %self.id, error = %e, ?message, "Failed to encode message");
                return;
            }
        };

        match shared.state {
            ChannelState::Ready => {
                trace!(channel_id = %self.id, %frame, "Sending frame");
                if let Err(e) = self.transport.send(frame) {
                    warn!(channel_id = %self.id, error = %e, "Transport write failed");
                    return;
                }
                if !message.is_heartbeat() {
                    shared.heartbeat.refresh();
                }
            }
            ChannelState::Connecting => {
                trace!(channel_id = %self.id, %frame, "Queueing frame");
                shared.queue.push(frame);
            }
            ChannelState::Closed => {
                debug!(channel_id = %self.id, ?message, "Dropping frame on closed channel");
            }
        }
    }

    /// Heartbeat timer callback.
    fn heartbeat_tick(&self) {
        let mut shared = self.shared.lock();
        // Never queued: a heartbeat only makes sense on a live socket
        if shared.state != ChannelState::Ready {
            return;
        }
        self.enqueue_or_send(&mut shared, ClientMessage::Heartbeat);
    }
}

// ============================================================================
// ChannelInner - Transport Events
// ============================================================================

impl ChannelInner {
    /// Routes one transport event. Returns `false` once the channel is closed.
    fn handle_event(self: &Arc<Self>, event: TransportEvent) -> bool {
        match event {
            TransportEvent::Open => self.on_open(),
            TransportEvent::Message(frame) => self.on_message(&frame),
            TransportEvent::Close(reason) => {
                let reason = reason.unwrap_or_else(|| "no reason".to_string());
                info!(channel_id = %self.id, %reason, "Transport closed");
                self.teardown(&reason);
            }
            TransportEvent::Error(cause) => {
                let e = Error::connection(cause);
                error!(channel_id = %self.id, error = %e, "Transport error");
                if self.teardown("transport error") {
                    self.transport.close();
                }
            }
        }

        self.shared.lock().state != ChannelState::Closed
    }

    fn on_open(self: &Arc<Self>) {
        let mut shared = self.shared.lock();
        if shared.state != ChannelState::Connecting {
            debug!(channel_id = %self.id, state = %shared.state, "Ignoring late open");
            return;
        }

        shared.state = ChannelState::Ready;
        let drained = shared.queue.drain_into(self.transport.as_ref());

        let weak = Arc::downgrade(self);
        shared.heartbeat.start(move || {
            if let Some(inner) = weak.upgrade() {
                inner.heartbeat_tick();
            }
        });

        info!(channel_id = %self.id, drained, "Channel ready");
    }

    fn on_message(&self, frame: &str) {
        {
            let shared = self.shared.lock();
            if shared.state != ChannelState::Ready {
                debug!(channel_id = %self.id, state = %shared.state, "Ignoring frame");
                return;
            }
            // Any inbound traffic counts as liveness
            shared.heartbeat.refresh();
        }

        trace!(channel_id = %self.id, %frame, "Frame received");

        let message = match decode(frame) {
            Ok(message) => message,
            Err(e) => {
                let e = Error::from(e);
                warn!(channel_id = %self.id, error = %e, %frame, "Discarding frame");
                return;
            }
        };

        let topic = message.topic();
        let DispatchReport { delivered, panicked } = self.registry.dispatch(topic);
        debug!(channel_id = %self.id, %topic, delivered, panicked, "Topic event dispatched");
    }

    /// Moves to `Closed`. Returns `false` if it already was.
    fn teardown(&self, reason: &str) -> bool {
        let mut shared = self.shared.lock();
        if shared.state == ChannelState::Closed {
            return false;
        }

        shared.state = ChannelState::Closed;
        shared.heartbeat.stop();
        shared.subscribed_topics.clear();
        let abandoned = shared.queue.clear();
        self.closed_tx.send_replace(true);

        debug!(channel_id = %self.id, reason, abandoned, "Channel closed");
        true
    }
}

// ============================================================================
// Event Pump
// ============================================================================

/// Feeds transport events to the channel, one at a time, until it closes.
async fn run_pump(inner: Weak<ChannelInner>, mut events: EventReceiver) {
    while let Some(event) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        if !inner.handle_event(event) {
            break;
        }
    }

    // Transport ended without a close event
    if let Some(inner) = inner.upgrade() {
        inner.teardown("event stream ended");
    }

    trace!("Channel event pump terminated");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::time::sleep;

    use crate::transport::{MemoryConnector, MemoryRemote};

    const SUBSCRIBE: &str = r#"{"type":"ListenForNewMail"}"#;
    const HEARTBEAT: &str = r#"{"type":"Heartbeat"}"#;
    const NEW_MAIL: &str = r#"{"type":"NewMailAvailable"}"#;

    /// Lets the pump task process injected events.
    async fn settle() {
        sleep(Duration::from_millis(1)).await;
    }

    fn open_channel() -> (Channel, MemoryRemote) {
        let connector = MemoryConnector::new();
        let remote = connector.remote();
        let channel = Channel::open(&connector, &ChannelOptions::default()).expect("open");
        (channel, remote)
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn heartbeats(remote: &MemoryRemote) -> usize {
        remote.sent().iter().filter(|f| *f == HEARTBEAT).count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_sends_queue_until_open() {
        let (channel, remote) = open_channel();
        assert_eq!(channel.state(), ChannelState::Connecting);

        channel.subscribe(Topic::NewMail, || {});
        assert_eq!(channel.queued_len(), 1);
        assert!(remote.sent().is_empty());

        remote.open();
        settle().await;

        assert!(channel.is_ready());
        assert_eq!(channel.queued_len(), 0);
        assert_eq!(remote.sent(), vec![SUBSCRIBE]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_subscribe_frame_per_topic() {
        let (channel, remote) = open_channel();

        channel.subscribe(Topic::NewMail, || {});
        channel.subscribe(Topic::NewMail, || {});
        remote.open();
        settle().await;
        channel.subscribe(Topic::NewMail, || {});

        assert_eq!(channel.listener_count(), 3);
        assert_eq!(remote.sent(), vec![SUBSCRIBE]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_when_ready_sends_immediately() {
        let (channel, remote) = open_channel();
        remote.open();
        settle().await;

        channel.subscribe(Topic::NewMail, || {});
        assert_eq!(remote.sent(), vec![SUBSCRIBE]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_unsubscribe_keeps_server_subscription() {
        let (channel, remote) = open_channel();
        remote.open();
        settle().await;

        let id = channel.subscribe(Topic::NewMail, || {});
        assert!(channel.unsubscribe(id));
        channel.subscribe(Topic::NewMail, || {});

        assert_eq!(remote.sent(), vec![SUBSCRIBE]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fan_out_to_all_listeners() {
        let (channel, remote) = open_channel();
        let (first, first_cb) = counter();
        let (second, second_cb) = counter();
        channel.subscribe(Topic::NewMail, first_cb);
        channel.subscribe(Topic::NewMail, second_cb);

        remote.open();
        remote.deliver(NEW_MAIL);
        settle().await;

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_order_and_removal() {
        let (channel, remote) = open_channel();
        let log = Arc::new(Mutex::new(Vec::new()));

        let make = |name: &'static str| {
            let log = Arc::clone(&log);
            move || log.lock().push(name)
        };
        channel.subscribe(Topic::NewMail, make("a"));
        let removed = channel.subscribe(Topic::NewMail, make("b"));
        channel.subscribe(Topic::NewMail, make("c"));
        channel.unsubscribe(removed);

        remote.open();
        remote.deliver(NEW_MAIL);
        settle().await;

        assert_eq!(*log.lock(), vec!["a", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_frames_are_tolerated() {
        let (channel, remote) = open_channel();
        let (count, callback) = counter();
        channel.subscribe(Topic::NewMail, callback);

        remote.open();
        remote.deliver(r#"{"type":"SomethingElse"}"#);
        remote.deliver(r#"{"kind":"NewMailAvailable"}"#);
        remote.deliver("garbage");
        settle().await;

        assert!(channel.is_ready());
        assert_eq!(count.load(Ordering::SeqCst), 0);

        remote.deliver(NEW_MAIL);
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_listener_does_not_close_channel() {
        let (channel, remote) = open_channel();
        let (count, callback) = counter();
        channel.subscribe(Topic::NewMail, || panic!("listener failure"));
        channel.subscribe(Topic::NewMail, callback);

        remote.open();
        remote.deliver(NEW_MAIL);
        settle().await;

        assert!(channel.is_ready());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_after_idle_period() {
        let (channel, remote) = open_channel();
        channel.subscribe(Topic::NewMail, || {});
        remote.open();
        settle().await;

        sleep(Duration::from_secs(29)).await;
        assert_eq!(heartbeats(&remote), 0);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(heartbeats(&remote), 1);

        sleep(Duration::from_secs(28)).await;
        assert_eq!(heartbeats(&remote), 1);
        assert_eq!(remote.sent(), vec![SUBSCRIBE, HEARTBEAT]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_outbound_send_resets_idle_window() {
        let (channel, remote) = open_channel();
        remote.open();
        settle().await;

        sleep(Duration::from_secs(20)).await;
        channel.subscribe(Topic::NewMail, || {});

        sleep(Duration::from_secs(20)).await;
        assert_eq!(heartbeats(&remote), 0);

        sleep(Duration::from_secs(11)).await;
        assert_eq!(heartbeats(&remote), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inbound_frame_resets_idle_window() {
        let (_channel, remote) = open_channel();
        remote.open();
        settle().await;

        sleep(Duration::from_secs(20)).await;
        remote.deliver(NEW_MAIL);
        settle().await;

        sleep(Duration::from_secs(20)).await;
        assert_eq!(heartbeats(&remote), 0);

        sleep(Duration::from_secs(11)).await;
        assert_eq!(heartbeats(&remote), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_stops_heartbeat_and_sends() {
        let (channel, remote) = open_channel();
        let (count, callback) = counter();
        channel.subscribe(Topic::NewMail, callback);
        remote.open();
        settle().await;
        assert!(channel.heartbeat_running());

        remote.close(Some("server restart"));
        settle().await;

        assert_eq!(channel.state(), ChannelState::Closed);
        assert!(!channel.heartbeat_running());

        sleep(Duration::from_secs(120)).await;
        assert_eq!(remote.sent(), vec![SUBSCRIBE]);

        // Frames after close are neither sent nor queued
        channel.subscribe(Topic::NewMail, || {});
        assert_eq!(channel.queued_len(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_before_open_abandons_queue() {
        let (channel, remote) = open_channel();
        channel.subscribe(Topic::NewMail, || {});
        assert_eq!(channel.queued_len(), 1);

        remote.fail("connection refused");
        settle().await;

        assert!(!channel.is_open());
        assert_eq!(channel.queued_len(), 0);

        // A late open must not revive the channel
        remote.open();
        settle().await;
        assert!(remote.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_close_closes_transport() {
        let (channel, remote) = open_channel();
        remote.open();
        settle().await;

        channel.close();

        assert!(remote.closed_by_client());
        assert_eq!(channel.state(), ChannelState::Closed);
        channel.close();
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_before_open_are_ignored() {
        let (channel, remote) = open_channel();
        let (count, callback) = counter();
        channel.subscribe(Topic::NewMail, callback);

        remote.deliver(NEW_MAIL);
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(channel.state(), ChannelState::Connecting);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_rejects_zero_heartbeat() {
        let connector = MemoryConnector::new();
        let remote = connector.remote();
        let options = ChannelOptions::default().with_heartbeat_interval(Duration::ZERO);

        let err = Channel::open(&connector, &options).expect_err("zero heartbeat");

        assert!(matches!(err, Error::Config { .. }));
        assert_eq!(remote.connection_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_on_closed_channel_registers_nothing() {
        let (channel, remote) = open_channel();
        remote.close(None);
        settle().await;

        let first = channel.subscribe(Topic::NewMail, || {});
        let second = channel.subscribe(Topic::NewMail, || {});

        assert_ne!(first, second);
        assert_eq!(channel.listener_count(), 0);
        assert!(!channel.unsubscribe(first));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_resolves_on_teardown() {
        let (channel, remote) = open_channel();
        remote.open();
        settle().await;

        let waiter = tokio::spawn({
            let channel = channel.clone();
            async move { channel.closed().await }
        });
        settle().await;
        assert!(!waiter.is_finished());

        remote.close(Some("server restart"));
        settle().await;
        assert!(waiter.is_finished());

        // Already closed: resolves at once
        channel.closed().await;
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ChannelState::Connecting.to_string(), "connecting");
        assert_eq!(ChannelState::Ready.to_string(), "ready");
        assert_eq!(ChannelState::Closed.to_string(), "closed");
    }
}
