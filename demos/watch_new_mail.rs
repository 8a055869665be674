//! Live mail list against a running Mercury server.
//!
//! Demonstrates:
//! - Building a client from the server's HTTP origin
//! - Following the mail list with an HTTP fetcher
//! - Printing each new item as it arrives
//!
//! Usage:
//!   cargo run --example watch_new_mail
//!   cargo run --example watch_new_mail -- --origin=http://localhost:8080
//!   cargo run --example watch_new_mail -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common::Args;
use mercury_client::{DisplayMode, HttpMailFetcher, MailFollower, MailId, NotificationClient};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    println!("=== Watch New Mail ===\n");
    println!("[Setup] Origin: {}", args.origin);

    let client = NotificationClient::builder()
        .origin(args.origin.as_str())
        .build()
        .context("building notification client")?;
    let fetcher = HttpMailFetcher::new(args.origin.as_str()).context("building mail fetcher")?;

    let follower = MailFollower::start(&client, Arc::new(fetcher.clone()));
    let mut updates = follower.updates();
    let mut printed: HashSet<MailId> = HashSet::new();

    if args.no_wait {
        tokio::time::timeout(Duration::from_secs(5), updates.changed())
            .await
            .ok();
        print_new(&follower, &fetcher, &mut printed);
        common::wait_for_exit(true).await;
        return Ok(());
    }

    println!("Waiting for mail. Press Ctrl+C to exit...\n");

    loop {
        tokio::select! {
            changed = updates.changed() => {
                changed.context("follower stopped")?;
                print_new(&follower, &fetcher, &mut printed);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    drop(follower);
    client.close();
    Ok(())
}

/// Prints items not shown yet, oldest first.
fn print_new(follower: &MailFollower, fetcher: &HttpMailFetcher, printed: &mut HashSet<MailId>) {
    follower.with_feed(|feed| {
        let fresh: Vec<_> = feed
            .newest_first()
            .filter(|item| !printed.contains(&item.id))
            .collect();

        for item in fresh.into_iter().rev() {
            printed.insert(item.id);
            let from = item
                .sender()
                .map(|m| m.display(DisplayMode::Long))
                .unwrap_or_else(|| "(unknown sender)".to_string());
            println!(
                "[#{}] {} -> {} | {}",
                item.id,
                from,
                item.recipient_display_string(),
                item.subject.as_deref().unwrap_or("(no subject)")
            );
            println!("        raw: {}", fetcher.raw_mail_url(item.id));
        }
    });
}
