//! Pulseboard replay runner
//!
//! Loads a recorded snapshot, replays a recorded notification stream through
//! the sync loop and prints the resulting board.
//!
//! # Usage
//!
//! ```bash
//! # Snapshot only
//! pulseboard --snapshot signals.json --tickets tickets.json
//!
//! # Snapshot plus a recorded feed, paced at 200ms per notification
//! pulseboard --snapshot signals.json --notifications feed.jsonl --delay-ms 200
//!
//! # Feed from stdin, machine-readable output
//! cat feed.jsonl | pulseboard --notifications - --json
//! ```
//!
//! # Environment Variables
//!
//! - `PULSE_CONFIG`: Path to the board configuration TOML
//! - `RUST_LOG`: Logging level (default: info)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use pulseboard::config::{self, PulseConfig};
use pulseboard::sync::replay::{load_snapshot_file, parse_notification_lines};
use pulseboard::types::{GroupedSignals, HealthSnapshot, PulseState};
use pulseboard::{Dashboard, ReplayBackend, SyncLoop, SyncStats};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "pulseboard")]
#[command(about = "Replay a recorded signal feed and print the live board")]
#[command(version)]
struct CliArgs {
    /// Signal snapshot (JSON array or one row per line)
    #[arg(long, value_name = "FILE")]
    snapshot: Option<PathBuf>,

    /// Ticket snapshot (JSON array or one row per line)
    #[arg(long, value_name = "FILE")]
    tickets: Option<PathBuf>,

    /// Recorded notifications, one envelope per line; "-" reads stdin
    #[arg(long, value_name = "FILE|-")]
    notifications: Option<String>,

    /// Board configuration TOML (overrides PULSE_CONFIG)
    #[arg(long, value_name = "FILE", env = "PULSE_CONFIG")]
    config: Option<PathBuf>,

    /// Delay between replayed notifications
    #[arg(long, default_value = "0")]
    delay_ms: u64,

    /// Print the final board as JSON
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

/// Final board printed on exit.
#[derive(Serialize)]
struct BoardReport {
    sync: SyncStats,
    health: HealthSnapshot,
    decisions: GroupedSignals,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_json);

    let pulse_config = match &args.config {
        Some(path) => PulseConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PulseConfig::load(),
    };
    config::init(pulse_config.clone());

    let signals = match &args.snapshot {
        Some(path) => load_snapshot_file(path)?,
        None => Vec::new(),
    };
    let tickets = match &args.tickets {
        Some(path) => load_snapshot_file(path)?,
        None => Vec::new(),
    };
    let notifications = match args.notifications.as_deref() {
        Some(source) => parse_notification_lines(&read_notifications(source).await?),
        None => Vec::new(),
    };

    info!(
        signals = signals.len(),
        tickets = tickets.len(),
        notifications = notifications.len(),
        "Replay loaded"
    );

    let backend =
        Arc::new(ReplayBackend::new(signals, tickets, notifications).with_delay_ms(args.delay_ms));
    let dashboard = Arc::new(RwLock::new(Dashboard::new(&pulse_config)));

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, stopping sync");
        shutdown_token.cancel();
    });

    let health_rx = dashboard.read().await.subscribe_health();
    let watcher_token = CancellationToken::new();
    let watcher = tokio::spawn(log_health_changes(health_rx, watcher_token.clone()));

    let stats = SyncLoop::new(backend, Arc::clone(&dashboard), cancel_token)
        .run()
        .await
        .context("Dashboard sync failed")?;

    watcher_token.cancel();
    watcher.await.ok();

    let board = dashboard.read().await;
    let report = BoardReport {
        sync: stats,
        health: board.health(),
        decisions: board.classified(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn read_notifications(source: &str) -> Result<String> {
    if source == "-" {
        use tokio::io::AsyncReadExt;
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("Failed to read notifications from stdin")?;
        Ok(buf)
    } else {
        tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("Failed to read notifications {}", source))
    }
}

async fn log_health_changes(
    mut rx: broadcast::Receiver<pulseboard::types::HealthChange>,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            msg = rx.recv() => match msg {
                Ok(change) => info!(
                    from = %change.from,
                    to = %change.to,
                    class = change.to.css_class(),
                    "Board health changed"
                ),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "Health watcher lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

fn print_report(report: &BoardReport) {
    let health = &report.health;
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  Board health:      {}", health.health_level);
    println!("  Tension:           {}", health.tension_level);
    println!("  Pending decisions: {}", health.pending_decisions);
    println!(
        "  Urgent / critical: {} / {}",
        health.urgent_count, health.critical_count
    );
    println!("  Open tickets:      {}", health.open_tickets);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for state in PulseState::ALL {
        println!("  {:<14} {}", state.display_name(), health.pipeline.get(state));
    }
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "  Approvals: {}  Exceptions: {}  Alerts: {}",
        report.decisions.approvals.len(),
        report.decisions.exceptions.len(),
        report.decisions.alerts.len()
    );
    let activity = &health.activity_summary;
    println!(
        "  Auto-resolved: {}  Approved: {}  Escalated: {}  Time saved: {}",
        activity.auto_resolved, activity.approved, activity.escalated, activity.time_saved_label
    );
    if !health.recent_events.is_empty() {
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        for event in &health.recent_events {
            println!(
                "  {} {:<6} {}",
                event.timestamp.format("%H:%M:%S"),
                event.kind.short_code(),
                event.signal_id
            );
        }
    }
    println!(
        "  Notifications: {} signal / {} ticket ({} rejected){}",
        report.sync.signal_notifications,
        report.sync.ticket_notifications,
        report.sync.rejected,
        if report.sync.cancelled { ", cancelled" } else { "" }
    );
}
