//! Host-fed location provider.
//!
//! The host keeps a [`PositionFeed`] and calls [`PositionFeed::push`] from its
//! platform callback. Pushes are funnelled through one bounded channel, so
//! even a host whose callbacks may overlap delivers samples to the reporter
//! one at a time.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use scout_core::config::WatchOptions;
use scout_core::error::ScoutResult;
use scout_core::{PermissionStatus, Position};
use tokio::sync::mpsc;
use tracing::debug;

use super::WATCH_CHANNEL_CAPACITY;
use crate::{LocationProvider, PositionStream};

type Slot = Arc<Mutex<Option<mpsc::Sender<Position>>>>;

/// Provider whose samples and permission answers come from the host.
pub struct ChannelLocationProvider {
    foreground: PermissionStatus,
    background: PermissionStatus,
    slot: Slot,
}

/// Producer handle for the currently active watch.
#[derive(Clone)]
pub struct PositionFeed {
    slot: Slot,
}

impl ChannelLocationProvider {
    /// Create a provider answering permission prompts with the given statuses.
    pub fn new(foreground: PermissionStatus, background: PermissionStatus) -> (Self, PositionFeed) {
        let slot: Slot = Arc::new(Mutex::new(None));
        let provider = Self { foreground, background, slot: Arc::clone(&slot) };
        (provider, PositionFeed { slot })
    }

    /// Provider with both permissions granted.
    pub fn granted() -> (Self, PositionFeed) {
        Self::new(PermissionStatus::Granted, PermissionStatus::Granted)
    }
}

#[async_trait]
impl LocationProvider for ChannelLocationProvider {
    async fn request_foreground_permission(&self) -> PermissionStatus {
        self.foreground
    }

    async fn request_background_permission(&self) -> ScoutResult<PermissionStatus> {
        Ok(self.background)
    }

    /// Each call replaces the previous watch; its stream ends.
    async fn watch_position(&self, options: WatchOptions) -> ScoutResult<PositionStream> {
        debug!("[location] channel watch started ({options:?})");
        let (tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
        Ok(rx)
    }
}

impl PositionFeed {
    /// Deliver a sample to the active watch.
    ///
    /// Returns `false` when no watch is running or its consumer went away.
    pub async fn push(&self, position: Position) -> bool {
        let tx = self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone();
        match tx {
            Some(tx) => tx.send(position).await.is_ok(),
            None => false,
        }
    }

    /// Terminate the active watch, as the OS would.
    pub fn end_watch(&self) {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    pub fn is_watching(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn push_without_watch_is_rejected() {
        let (_provider, feed) = ChannelLocationProvider::granted();
        assert!(!feed.is_watching());
        assert!(!feed.push(Position::new(1.0, 2.0)).await);
    }

    #[tokio::test]
    async fn samples_arrive_in_order() {
        let (provider, feed) = ChannelLocationProvider::granted();
        let mut rx = provider.watch_position(WatchOptions::default()).await.unwrap();
        assert!(feed.is_watching());
        for i in 0..5 {
            assert!(feed.push(Position::new(i as f64, 0.0)).await);
        }
        for i in 0..5 {
            assert_eq!(rx.recv().await.unwrap().latitude, i as f64);
        }
    }

    #[tokio::test]
    async fn end_watch_closes_stream() {
        let (provider, feed) = ChannelLocationProvider::granted();
        let mut rx = provider.watch_position(WatchOptions::default()).await.unwrap();
        feed.end_watch();
        assert!(rx.recv().await.is_none());
        assert!(!feed.push(Position::new(0.0, 0.0)).await);
    }

    #[tokio::test]
    async fn new_watch_replaces_old() {
        let (provider, feed) = ChannelLocationProvider::granted();
        let mut first = provider.watch_position(WatchOptions::default()).await.unwrap();
        let mut second = provider.watch_position(WatchOptions::default()).await.unwrap();
        assert!(first.recv().await.is_none());
        assert!(feed.push(Position::new(3.0, 4.0)).await);
        assert_eq!(second.recv().await, Some(Position::new(3.0, 4.0)));
    }

    #[tokio::test]
    async fn reports_configured_permissions() {
        let (provider, _feed) = ChannelLocationProvider::new(PermissionStatus::Denied, PermissionStatus::Undetermined);
        assert_eq!(provider.request_foreground_permission().await, PermissionStatus::Denied);
        assert_eq!(provider.request_background_permission().await.unwrap(), PermissionStatus::Undetermined);
    }
}
