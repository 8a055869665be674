//! Channel lifecycle without a server.
//!
//! Demonstrates:
//! - Subscribing before the socket is open (frames are queued)
//! - Delivery to several listeners, one of which panics
//! - Idle heartbeats
//! - Reconnection on the next subscribe after a close
//!
//! Usage:
//!   cargo run --example offline_channel
//!   cargo run --example offline_channel -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use common::Args;
use mercury_client::{MemoryConnector, NotificationClient, Result};

// ============================================================================
// Constants
// ============================================================================

const NEW_MAIL: &str = r#"{"type":"NewMailAvailable"}"#;

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    println!("=== Offline Channel ===\n");

    let connector = MemoryConnector::new();
    let remote = connector.remote();

    let client = NotificationClient::builder()
        .connector(connector)
        .heartbeat_interval(Duration::from_millis(200))
        .build()?;

    // ========================================================================
    // Subscribe while connecting
    // ========================================================================

    println!("[1] Subscribing before the socket opens...");
    let first = client.on_new_mail(|| println!("        listener A: new mail"));
    client.on_new_mail(|| panic!("listener B always fails"));
    client.on_new_mail(|| println!("        listener C: new mail"));
    println!("        sent so far: {:?}", remote.sent());

    remote.open();
    settle().await;
    println!("        sent after open: {:?}\n", remote.sent());

    // ========================================================================
    // Delivery
    // ========================================================================

    println!("[2] Server pushes NewMailAvailable...");
    remote.deliver(NEW_MAIL);
    settle().await;
    println!();

    println!("[3] Unsubscribing listener A...");
    client.unsubscribe(first);
    remote.deliver(NEW_MAIL);
    settle().await;
    println!();

    // ========================================================================
    // Heartbeat
    // ========================================================================

    println!("[4] Staying idle for 500ms...");
    tokio::time::sleep(Duration::from_millis(500)).await;
    println!("        sent: {:?}\n", remote.sent());

    // ========================================================================
    // Reconnect
    // ========================================================================

    println!("[5] Server closes; next subscribe dials again...");
    remote.close(Some("server restart"));
    settle().await;
    client.on_new_mail(|| println!("        listener D: new mail"));
    remote.open();
    settle().await;
    println!(
        "        connections: {}, sent on new link: {:?}",
        remote.connection_count(),
        remote.sent()
    );

    client.close();
    println!("\n=== Done ===");
    Ok(())
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}
