//! Outbound frame queue.
//!
//! Holds encoded frames written while the channel is still connecting.
//! Drained exactly once, in enqueue order, when the transport opens.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::mem;

use tracing::{trace, warn};

use crate::transport::Transport;

// ============================================================================
// OutboundQueue
// ============================================================================

/// FIFO of encoded frames awaiting a ready transport.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    frames: VecDeque<String>,
}

impl OutboundQueue {
    /// Creates an empty queue.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a frame to the tail.
    #[inline]
    pub fn push(&mut self, frame: String) {
        self.frames.push_back(frame);
    }

    /// Returns the number of queued frames.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns `true` if nothing is queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Writes every queued frame to `transport` in order and empties the queue.
    ///
    /// Stops at the first failed write; the rest is abandoned since the
    /// transport is going away. Returns the number of frames written.
    pub fn drain_into(&mut self, transport: &dyn Transport) -> usize {
        let frames = mem::take(&mut self.frames);
        let total = frames.len();
        let mut written = 0;

        for frame in frames {
            trace!(%frame, "Sending queued frame");
            if let Err(e) = transport.send(frame) {
                warn!(error = %e, abandoned = total - written, "Queue drain interrupted");
                break;
            }
            written += 1;
        }

        written
    }

    /// Drops every queued frame. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.frames.len();
        self.frames.clear();
        dropped
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use tokio::sync::mpsc;

    use crate::transport::{Connector, MemoryConnector};

    fn memory_transport() -> (Box<dyn Transport>, crate::transport::MemoryRemote) {
        let connector = MemoryConnector::new();
        let remote = connector.remote();
        let (events_tx, _events_rx) = mpsc::unbounded_channel();
        (connector.connect(events_tx), remote)
    }

    #[test]
    fn test_drain_preserves_order_and_empties() {
        let (transport, remote) = memory_transport();
        let mut queue = OutboundQueue::new();
        queue.push("1".into());
        queue.push("2".into());
        queue.push("3".into());

        assert_eq!(queue.drain_into(transport.as_ref()), 3);
        assert!(queue.is_empty());
        assert_eq!(remote.sent(), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_drain_stops_on_closed_transport() {
        let (transport, remote) = memory_transport();
        transport.close();

        let mut queue = OutboundQueue::new();
        queue.push("lost".into());

        assert_eq!(queue.drain_into(transport.as_ref()), 0);
        assert!(queue.is_empty());
        assert!(remote.sent().is_empty());
    }

    #[test]
    fn test_clear_reports_dropped() {
        let mut queue = OutboundQueue::new();
        queue.push("a".into());
        queue.push("b".into());
        assert_eq!(queue.clear(), 2);
        assert_eq!(queue.len(), 0);
    }

    proptest! {
        #[test]
        fn prop_drain_writes_in_enqueue_order(frames in proptest::collection::vec("[a-z]{0,8}", 0..32)) {
            let (transport, remote) = memory_transport();
            let mut queue = OutboundQueue::new();
            for frame in &frames {
                queue.push(frame.clone());
            }

            prop_assert_eq!(queue.drain_into(transport.as_ref()), frames.len());
            prop_assert_eq!(remote.sent(), frames);
        }
    }
}
