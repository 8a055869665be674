//! Shared utilities for demos.
//!
//! Provides common functionality used across all demos:
//! - Command-line argument parsing
//! - Logging initialization
//! - Graceful exit handling

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

/// Origin used when neither `--origin=` nor `MERCURY_ORIGIN` is given.
pub const DEFAULT_ORIGIN: &str = "http://localhost:8080";

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments for demos.
#[derive(Debug, Clone)]
pub struct Args {
    pub debug: bool,
    pub no_wait: bool,
    pub origin: String,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let origin = args
            .iter()
            .find_map(|a| a.strip_prefix("--origin=").map(str::to_owned))
            .or_else(|| std::env::var("MERCURY_ORIGIN").ok())
            .unwrap_or_else(|| DEFAULT_ORIGIN.to_string());

        Self {
            debug: args.iter().any(|a| a == "--debug"),
            no_wait: args.iter().any(|a| a == "--no-wait"),
            origin,
        }
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging. `RUST_LOG` overrides the default filter.
pub fn init_logging(debug: bool) {
    let default = if debug {
        "mercury_client=debug"
    } else {
        "mercury_client=info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Wait for Ctrl+C or skip if `--no-wait` flag is set.
pub async fn wait_for_exit(no_wait: bool) {
    if no_wait {
        println!("[--no-wait] Skipping wait");
        return;
    }

    println!("Press Ctrl+C to exit...");
    tokio::signal::ctrl_c().await.ok();
}
