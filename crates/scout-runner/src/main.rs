//! # scout-runner
//!
//! Runs one field-agent session from a JSON configuration file: background
//! position reporting plus live CRM event notifications.
//!
//! Positions come from `--replay <file>` (NDJSON fixes) or, without it, one
//! JSON fix per line on stdin.
//!
//! # Usage
//!
//! ```bash
//! scout-runner config.json --replay route.ndjson --log-level info
//! ```

mod session;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use scout_core::logging::LogFormat;
use scout_core::{PermissionStatus, Position};
use scout_location::{ChannelLocationProvider, LocationProvider, PositionFeed, ReplayLocationProvider};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::session::Session;

/// Field agent location reporter and live event notifier.
#[derive(Parser)]
#[command(name = "scout-runner", about = "Field agent location reporter and live event notifier")]
struct Cli {
    /// Configuration file path (JSON).
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output (overrides the config).
    #[arg(long)]
    log_dir: Option<String>,

    /// Console log format (pretty, json); overrides the config.
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Replay position fixes from an NDJSON file instead of reading stdin.
    #[arg(long)]
    replay: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration
    let config = scout_core::config::load_config(&cli.config)?;

    // 2. Initialize logging
    let log_dir = cli.log_dir.clone().or_else(|| config.log_path());
    scout_core::logging::init_logging(
        &cli.log_level,
        log_dir.as_deref(),
        &config.module_name(),
        cli.log_format.unwrap_or_else(|| config.log_format()),
    );
    info!("scout-runner starting: config={}, log_level={}", cli.config.display(), cli.log_level);

    // 3. Location source
    let mut stdin_feed = None;
    let provider: Arc<dyn LocationProvider> = match &cli.replay {
        Some(path) => Arc::new(ReplayLocationProvider::new(path)),
        None => {
            let (provider, feed) = ChannelLocationProvider::new(PermissionStatus::Granted, PermissionStatus::Granted);
            stdin_feed = Some(feed);
            Arc::new(provider)
        }
    };

    // 4. Start the session, then feed it
    let mut session = Session::new(&config, provider)?;
    session.start().await?;
    if let Some(feed) = stdin_feed {
        tokio::spawn(feed_from_stdin(feed));
    }
    info!("session started, press Ctrl+C to stop");

    // 5. Wait for shutdown signal (or the end of a replay)
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("shutdown signal received");
        }
        _ = session.watch_ended() => {
            info!("location source exhausted");
        }
    }

    // 6. Stop gracefully
    session.stop().await;
    info!("session stopped");
    Ok(())
}

/// Forward JSON fixes from stdin, one per line, into the active watch.
async fn feed_from_stdin(feed: PositionFeed) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => match serde_json::from_str::<Position>(&line) {
                Ok(position) => {
                    if !feed.push(position).await {
                        warn!("[stdin] no active location watch, fix dropped");
                    }
                }
                Err(e) => warn!("[stdin] ignoring bad fix: {e}"),
            },
            Ok(None) => break,
            Err(e) => {
                warn!("[stdin] read error: {e}");
                break;
            }
        }
    }
    info!("[stdin] input closed, ending location watch");
    feed.end_watch();
}
