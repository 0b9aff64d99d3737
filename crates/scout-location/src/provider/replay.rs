//! Replays recorded position fixes from an NDJSON file.
//!
//! One JSON object per line, `{"latitude": 45.76, "longitude": 4.83}`. Blank
//! lines and lines starting with `#` are skipped. Fixes are gated with the
//! watch options the same way the platform watch would: a fix closer than
//! `distance_interval_m` to the last delivered one is dropped, and delivered
//! fixes are spaced `time_interval` apart.

use std::path::PathBuf;

use async_trait::async_trait;
use scout_core::config::WatchOptions;
use scout_core::error::{ScoutError, ScoutResult};
use scout_core::{PermissionStatus, Position};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::WATCH_CHANNEL_CAPACITY;
use crate::{LocationProvider, PositionStream};

/// File-backed provider; grants every permission.
pub struct ReplayLocationProvider {
    path: PathBuf,
}

impl ReplayLocationProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl LocationProvider for ReplayLocationProvider {
    async fn request_foreground_permission(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    async fn request_background_permission(&self) -> ScoutResult<PermissionStatus> {
        Ok(PermissionStatus::Granted)
    }

    async fn watch_position(&self, options: WatchOptions) -> ScoutResult<PositionStream> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ScoutError::Location(format!("{}: {e}", self.path.display())))?;
        let fixes = gate_fixes(parse_fixes(&content)?, options.distance_interval_m);
        info!("[location] replaying {} fix(es) from {}", fixes.len(), self.path.display());

        let (tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
        let interval = options.time_interval();
        tokio::spawn(async move {
            for (i, fix) in fixes.into_iter().enumerate() {
                if i > 0 {
                    tokio::time::sleep(interval).await;
                }
                if tx.send(fix).await.is_err() {
                    debug!("[location] replay consumer gone");
                    return;
                }
            }
            debug!("[location] replay finished");
        });
        Ok(rx)
    }
}

/// Parse NDJSON fixes, reporting the first bad line.
pub fn parse_fixes(content: &str) -> ScoutResult<Vec<Position>> {
    content
        .lines()
        .enumerate()
        .map(|(n, line)| (n + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(n, line)| {
            serde_json::from_str::<Position>(line).map_err(|e| ScoutError::Location(format!("line {n}: {e}")))
        })
        .collect()
}

/// Drop fixes that moved less than `min_distance_m` from the last kept one.
pub fn gate_fixes(fixes: Vec<Position>, min_distance_m: f64) -> Vec<Position> {
    let mut kept: Vec<Position> = Vec::with_capacity(fixes.len());
    for fix in fixes {
        match kept.last() {
            Some(last) if last.distance_to(&fix) < min_distance_m => {}
            _ => kept.push(fix),
        }
    }
    kept
}
