//! In-memory loopback connector.
//!
//! [`MemoryConnector`] stands in for a real socket: every frame the channel
//! writes is recorded, and the paired [`MemoryRemote`] plays the server side
//! by injecting lifecycle events and inbound frames.
//!
//! # Example
//!
//! ```ignore
//! let connector = MemoryConnector::new();
//! let remote = connector.remote();
//!
//! let client = NotificationClient::builder()
//!     .url("ws://offline/api/listen")
//!     .connector(connector)
//!     .build()?;
//!
//! client.on_new_mail(|| println!("new mail"));
//! remote.open();
//! remote.deliver(r#"{"type":"NewMailAvailable"}"#);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::{Error, Result};

use super::{Connector, EventSender, Transport, TransportEvent};

// ============================================================================
// Types
// ============================================================================

/// One dialed connection.
struct Link {
    /// Event sink of the channel that dialed.
    events: EventSender,
    /// Frames written by the channel, in order.
    sent: Vec<String>,
    /// Set once either side closed.
    closed: bool,
    /// Set when the channel requested the close.
    closed_by_client: bool,
}

/// State shared between connector, transports and remote.
#[derive(Default)]
struct Links {
    links: Vec<Link>,
}

// ============================================================================
// MemoryConnector
// ============================================================================

/// Connector producing in-memory transports.
///
/// Cloning shares the same set of links.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    shared: Arc<Mutex<Links>>,
}

impl MemoryConnector {
    /// Creates a connector with no links.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the server-side handle.
    #[inline]
    #[must_use]
    pub fn remote(&self) -> MemoryRemote {
        MemoryRemote {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, events: EventSender) -> Box<dyn Transport> {
        let mut shared = self.shared.lock();
        shared.links.push(Link {
            events,
            sent: Vec::new(),
            closed: false,
            closed_by_client: false,
        });
        let index = shared.links.len() - 1;
        trace!(index, "Memory link dialed");

        Box::new(MemoryTransport {
            shared: Arc::clone(&self.shared),
            index,
        })
    }
}

// ============================================================================
// MemoryTransport
// ============================================================================

/// Client side of one link.
struct MemoryTransport {
    shared: Arc<Mutex<Links>>,
    index: usize,
}

impl Transport for MemoryTransport {
    fn send(&self, frame: String) -> Result<()> {
        let mut shared = self.shared.lock();
        let link = &mut shared.links[self.index];
        if link.closed {
            return Err(Error::ConnectionClosed);
        }
        link.sent.push(frame);
        Ok(())
    }

    fn close(&self) {
        let mut shared = self.shared.lock();
        let link = &mut shared.links[self.index];
        if !link.closed {
            link.closed = true;
            link.closed_by_client = true;
        }
    }
}

// ============================================================================
// MemoryRemote
// ============================================================================

/// Server side of the most recently dialed link.
///
/// All methods are no-ops when nothing has been dialed yet.
#[derive(Clone)]
pub struct MemoryRemote {
    shared: Arc<Mutex<Links>>,
}

impl MemoryRemote {
    /// Signals that the socket is open.
    pub fn open(&self) {
        self.emit(TransportEvent::Open);
    }

    /// Delivers an inbound text frame.
    pub fn deliver(&self, frame: impl Into<String>) {
        self.emit(TransportEvent::Message(frame.into()));
    }

    /// Closes the link from the server side.
    pub fn close(&self, reason: Option<&str>) {
        self.mark_closed();
        self.emit(TransportEvent::Close(reason.map(str::to_owned)));
    }

    /// Fails the link with a socket error.
    pub fn fail(&self, cause: impl Into<String>) {
        self.mark_closed();
        self.emit(TransportEvent::Error(cause.into()));
    }

    /// Returns the frames written on the latest link.
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        self.shared
            .lock()
            .links
            .last()
            .map(|link| link.sent.clone())
            .unwrap_or_default()
    }

    /// Returns the frames written on the link at `index` (dial order).
    #[must_use]
    pub fn sent_on(&self, index: usize) -> Vec<String> {
        self.shared
            .lock()
            .links
            .get(index)
            .map(|link| link.sent.clone())
            .unwrap_or_default()
    }

    /// Returns how many times the connector was dialed.
    #[inline]
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.shared.lock().links.len()
    }

    /// Returns `true` if the channel closed the latest link itself.
    #[must_use]
    pub fn closed_by_client(&self) -> bool {
        self.shared
            .lock()
            .links
            .last()
            .is_some_and(|link| link.closed_by_client)
    }

    fn mark_closed(&self) {
        if let Some(link) = self.shared.lock().links.last_mut() {
            link.closed = true;
        }
    }

    fn emit(&self, event: TransportEvent) {
        if let Some(link) = self.shared.lock().links.last() {
            let _ = link.events.send(event);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::sync::mpsc;

    #[test]
    fn test_send_records_frames_in_order() {
        let connector = MemoryConnector::new();
        let remote = connector.remote();
        let (events_tx, _events_rx) = mpsc::unbounded_channel();

        let transport = connector.connect(events_tx);
        transport.send("a".into()).expect("send");
        transport.send("b".into()).expect("send");

        assert_eq!(remote.sent(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(remote.connection_count(), 1);
    }

    #[test]
    fn test_send_after_close_fails() {
        let connector = MemoryConnector::new();
        let remote = connector.remote();
        let (events_tx, _events_rx) = mpsc::unbounded_channel();

        let transport = connector.connect(events_tx);
        transport.close();

        assert!(remote.closed_by_client());
        assert!(matches!(
            transport.send("late".into()),
            Err(Error::ConnectionClosed)
        ));
    }

    #[test]
    fn test_remote_events_reach_latest_link() {
        let connector = MemoryConnector::new();
        let remote = connector.remote();
        let (first_tx, mut first_rx) = mpsc::unbounded_channel();
        let (second_tx, mut second_rx) = mpsc::unbounded_channel();

        let _first = connector.connect(first_tx);
        let _second = connector.connect(second_tx);
        remote.open();
        remote.deliver("frame");

        assert!(first_rx.try_recv().is_err());
        assert_eq!(second_rx.try_recv().ok(), Some(TransportEvent::Open));
        assert_eq!(
            second_rx.try_recv().ok(),
            Some(TransportEvent::Message("frame".into()))
        );
    }

    #[test]
    fn test_remote_without_links_is_noop() {
        let remote = MemoryConnector::new().remote();
        remote.open();
        remote.close(None);
        assert!(remote.sent().is_empty());
        assert!(!remote.closed_by_client());
    }
}
