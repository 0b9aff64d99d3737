//! A signed-in agent session: position reporter plus live event notifier.
//!
//! The two components share nothing; the session only starts and stops them
//! together.

use std::sync::Arc;

use anyhow::Result;
use scout_core::config::AppConfig;
use scout_core::{AgentIdentity, ReporterState};
use scout_events::{LiveEventNotifier, LogNotificationSink, SseTransport};
use scout_location::{HttpUploader, LocationProvider, NominatimGeocoder, PositionReporter};
use tracing::{info, warn};

pub struct Session {
    agent: Option<AgentIdentity>,
    reporter: PositionReporter,
    notifier: Option<LiveEventNotifier>,
    watchers: Vec<tokio::task::JoinHandle<()>>,
}

impl Session {
    /// Wire the components from config. Nothing starts yet.
    pub fn new(config: &AppConfig, provider: Arc<dyn LocationProvider>) -> Result<Self> {
        let reporter = PositionReporter::new(
            config.reporter.clone(),
            provider,
            Arc::new(NominatimGeocoder::new(&config.reporter)?),
            Arc::new(HttpUploader::new(&config.reporter)?),
        );

        let notifier = match &config.events {
            Some(events) => Some(LiveEventNotifier::new(
                events,
                Arc::new(SseTransport::new(events)?),
                Arc::new(LogNotificationSink),
            )),
            None => None,
        };

        Ok(Self { agent: config.session.clone(), reporter, notifier, watchers: Vec::new() })
    }

    pub async fn start(&mut self) -> Result<()> {
        match self.reporter.start(self.agent.as_ref()).await? {
            ReporterState::Tracking => self.spawn_address_log(),
            ReporterState::Idle => warn!("[session] no agent in config, location reporting disabled"),
            ReporterState::PermissionDenied => warn!("[session] location permission denied"),
            ReporterState::WatchEnded => {}
        }

        match self.notifier.as_mut() {
            Some(notifier) => notifier.start().await,
            None => info!("[session] no events endpoint configured"),
        }
        Ok(())
    }

    pub async fn stop(&mut self) {
        if let Some(notifier) = self.notifier.as_mut() {
            notifier.stop().await;
        }
        self.reporter.stop().await;
        for watcher in self.watchers.drain(..) {
            watcher.abort();
        }
    }

    /// Resolves once the location watch has ended on its own.
    pub async fn watch_ended(&self) {
        let mut state = self.reporter.state();
        let _ = state.wait_for(|s| *s == ReporterState::WatchEnded).await;
    }

    fn spawn_address_log(&mut self) {
        let mut address = self.reporter.address();
        self.watchers.push(tokio::spawn(async move {
            while address.changed().await.is_ok() {
                let current = address.borrow_and_update().clone();
                info!("[session] agent is at {current}");
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use scout_core::PermissionStatus;
    use scout_location::ChannelLocationProvider;

    use super::*;

    #[tokio::test]
    async fn session_without_agent_or_events_stays_idle() {
        let config = AppConfig::from_json_str(r#"{"reporter": {"base_url": "http://127.0.0.1:9"}}"#).unwrap();
        let (provider, feed) = ChannelLocationProvider::new(PermissionStatus::Granted, PermissionStatus::Granted);
        let mut session = Session::new(&config, Arc::new(provider)).unwrap();
        assert!(session.notifier.is_none());

        session.start().await.unwrap();
        assert!(!feed.is_watching());
        assert_eq!(*session.reporter.state().borrow(), ReporterState::Idle);
        session.stop().await;
    }

    #[tokio::test]
    async fn session_with_agent_tracks_until_watch_ends() {
        let config = AppConfig::from_json_str(
            r#"{"session": {"agent_id": "a-1"}, "reporter": {"base_url": "http://127.0.0.1:9"}}"#,
        )
        .unwrap();
        let (provider, feed) = ChannelLocationProvider::new(PermissionStatus::Granted, PermissionStatus::Denied);
        let mut session = Session::new(&config, Arc::new(provider)).unwrap();

        session.start().await.unwrap();
        assert!(feed.is_watching());
        feed.end_watch();
        tokio::time::timeout(std::time::Duration::from_secs(5), session.watch_ended()).await.unwrap();
        session.stop().await;
        assert_eq!(*session.reporter.state().borrow(), ReporterState::Idle);
    }
}
