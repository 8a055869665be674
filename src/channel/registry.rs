//! Listener registry.
//!
//! Maps [`ListenerId`] handles to callbacks and fans topic events out to
//! them. Handles come from a counter owned by the registry, so ordering by
//! handle is registration order.
//!
//! # Dispatch
//!
//! Dispatch snapshots the matching callbacks, releases the lock, then calls
//! each one. Callbacks may therefore register or unregister listeners
//! (including themselves) without deadlocking; such changes apply from the
//! next dispatch on. A panicking callback is caught and logged and the
//! remaining callbacks still run.

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::identifiers::{ListenerId, Topic};

// ============================================================================
// Types
// ============================================================================

/// Zero-argument notification callback.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// One registration.
struct Entry {
    topic: Topic,
    listener: Listener,
}

/// Lock-protected registry state.
#[derive(Default)]
struct Entries {
    /// Last issued handle value.
    last_id: u64,
    /// Registrations keyed by handle (ordered = registration order).
    by_id: BTreeMap<ListenerId, Entry>,
}

// ============================================================================
// DispatchReport
// ============================================================================

/// Outcome of one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Callbacks that returned normally.
    pub delivered: usize,
    /// Callbacks that panicked.
    pub panicked: usize,
}

// ============================================================================
// ListenerRegistry
// ============================================================================

/// Topic-keyed callback registry with multi-subscriber fan-out.
#[derive(Default)]
pub struct ListenerRegistry {
    entries: Mutex<Entries>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback and returns its handle.
    pub fn register(&self, topic: Topic, listener: Listener) -> ListenerId {
        let mut entries = self.entries.lock();
        entries.last_id += 1;
        let id = ListenerId::new(entries.last_id);
        entries.by_id.insert(id, Entry { topic, listener });

        trace!(listener_id = %id, %topic, "Listener registered");
        id
    }

    /// Issues a handle without registering anything under it.
    pub fn reserve(&self) -> ListenerId {
        let mut entries = self.entries.lock();
        entries.last_id += 1;
        ListenerId::new(entries.last_id)
    }

    /// Removes a callback. Unknown handles are ignored.
    ///
    /// Returns `true` if something was removed.
    pub fn unregister(&self, id: ListenerId) -> bool {
        let removed = self.entries.lock().by_id.remove(&id).is_some();
        if removed {
            trace!(listener_id = %id, "Listener removed");
        }
        removed
    }

    /// Returns the total number of registrations.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().by_id.len()
    }

    /// Returns `true` if nothing is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().by_id.is_empty()
    }

    /// Returns the number of registrations for `topic`.
    #[must_use]
    pub fn count(&self, topic: Topic) -> usize {
        self.entries
            .lock()
            .by_id
            .values()
            .filter(|entry| entry.topic == topic)
            .count()
    }

    /// Invokes every callback registered for `topic`, in registration order.
    pub fn dispatch(&self, topic: Topic) -> DispatchReport {
        let snapshot: Vec<(ListenerId, Listener)> = {
            let entries = self.entries.lock();
            entries
                .by_id
                .iter()
                .filter(|(_, entry)| entry.topic == topic)
                .map(|(id, entry)| (*id, Arc::clone(&entry.listener)))
                .collect()
        };

        let mut report = DispatchReport::default();

        for (id, listener) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| listener())) {
                Ok(()) => report.delivered += 1,
                Err(payload) => {
                    report.panicked += 1;
                    warn!(
                        listener_id = %id,
                        %topic,
                        panic = panic_message(payload.as_ref()),
                        "Listener panicked"
                    );
                }
            }
        }

        trace!(%topic, delivered = report.delivered, panicked = report.panicked, "Dispatched");
        report
    }
}

/// Extracts a printable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic>"
    }
}

// ============================================================================
// Tests
// ============================================================================
