//! Idle heartbeat timer.
//!
//! One background task per running timer sleeps until a shared deadline.
//! [`Heartbeat::refresh`] only moves the deadline forward, so at most one
//! timer is ever pending and refreshing never spawns.
//!
//! ```text
//! start ──► deadline = now + period
//! refresh ─► deadline = now + period        (sleeping task re-arms)
//! fire ───► on_tick(); deadline = now + period
//! stop ───► task aborted
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, trace};

// ============================================================================
// Heartbeat
// ============================================================================

/// Shortest accepted period. Shorter ones (including zero) are raised to it.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Recurring idle timer.
pub struct Heartbeat {
    /// Full idle period.
    period: Duration,
    /// Next fire time, shared with the timer task.
    deadline: Arc<Mutex<Instant>>,
    /// Running timer task.
    task: Option<JoinHandle<()>>,
}

impl Heartbeat {
    /// Creates a stopped timer.
    ///
    /// `period` is raised to [`MIN_PERIOD`] if shorter.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        let period = period.max(MIN_PERIOD);
        Self {
            period,
            deadline: Arc::new(Mutex::new(Instant::now() + period)),
            task: None,
        }
    }

    /// Starts the timer. No-op if already running.
    ///
    /// `on_tick` runs on the timer task each time a full period elapses
    /// without a refresh. It must not refresh this timer.
    pub fn start<F>(&mut self, on_tick: F)
    where
        F: Fn() + Send + 'static,
    {
        if self.task.is_some() {
            return;
        }

        debug!(period_ms = self.period.as_millis() as u64, "Starting heartbeat");

        *self.deadline.lock() = Instant::now() + self.period;
        let deadline = Arc::clone(&self.deadline);
        let period = self.period;

        self.task = Some(tokio::spawn(async move {
            loop {
                let at = *deadline.lock();
                sleep_until(at).await;

                let now = Instant::now();
                {
                    let mut next = deadline.lock();
                    if now < *next {
                        // Refreshed while sleeping
                        continue;
                    }
                    *next = now + period;
                }

                trace!("Heartbeat tick");
                on_tick();
            }
        }));
    }

    /// Pushes the next fire time a full period into the future.
    ///
    /// No-op when the timer is not running.
    pub fn refresh(&self) {
        if self.task.is_none() {
            return;
        }
        *self.deadline.lock() = Instant::now() + self.period;
    }

    /// Cancels the timer. No-op when not running.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("Stopping heartbeat");
            task.abort();
        }
    }

    /// Returns `true` while the timer task is running.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Returns the idle period.
    #[inline]
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// Tests
// ============================================================================
