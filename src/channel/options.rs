//! Channel tuning options.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use mercury_client::ChannelOptions;
//!
//! let options = ChannelOptions::new().with_heartbeat_interval(Duration::from_secs(10));
//! assert!(options.validate().is_ok());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Outbound idle time before a heartbeat is sent.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

// ============================================================================
// ChannelOptions
// ============================================================================

/// Per-channel configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOptions {
    /// Idle period after which a heartbeat frame is written.
    pub heartbeat_interval: Duration,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelOptions {
    /// Creates options with the default 30s heartbeat.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }

    /// Sets the heartbeat interval.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.heartbeat_interval.is_zero() {
            return Err("Heartbeat interval must be greater than zero".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
