//! Position reporter: sample loop, geocode gating and best-effort upload.
//!
//! Each `PositionReporter` runs one tokio task that:
//! 1. Receives samples from the provider's watch, one at a time.
//! 2. Publishes the sample as the current position.
//! 3. Feeds it through the [`GeocodeGate`]; past the threshold a reverse
//!    geocode is spawned and, on success, replaces the published address.
//! 4. Spawns an upload of the sample.
//!
//! Geocode and upload tasks are fire-and-forget: they may overlap across
//! samples and never hold up the next one.

use std::sync::Arc;

use scout_core::config::ReporterConfig;
use scout_core::error::ScoutResult;
use scout_core::{AgentIdentity, LocationReport, Position, ReporterState, ResolvedAddress};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::gate::{GateDecision, GeocodeGate};
use crate::{Geocoder, LocationProvider, PositionSink, PositionStream};

/// Background position reporter for one session.
pub struct PositionReporter {
    config: ReporterConfig,
    provider: Arc<dyn LocationProvider>,
    geocoder: Arc<dyn Geocoder>,
    sink: Arc<dyn PositionSink>,
    position_tx: Arc<watch::Sender<Option<Position>>>,
    address_tx: Arc<watch::Sender<ResolvedAddress>>,
    state_tx: Arc<watch::Sender<ReporterState>>,
    /// Shutdown signal sender.
    shutdown_tx: Option<watch::Sender<bool>>,
    /// Sample loop join handle.
    task: Option<tokio::task::JoinHandle<()>>,
}

impl PositionReporter {
    /// Create a reporter (nothing runs until [`start`](Self::start)).
    pub fn new(
        config: ReporterConfig,
        provider: Arc<dyn LocationProvider>,
        geocoder: Arc<dyn Geocoder>,
        sink: Arc<dyn PositionSink>,
    ) -> Self {
        Self {
            config,
            provider,
            geocoder,
            sink,
            position_tx: Arc::new(watch::channel(None).0),
            address_tx: Arc::new(watch::channel(ResolvedAddress::default()).0),
            state_tx: Arc::new(watch::channel(ReporterState::Idle).0),
            shutdown_tx: None,
            task: None,
        }
    }

    /// Latest sample, `None` before the first one.
    pub fn position(&self) -> watch::Receiver<Option<Position>> {
        self.position_tx.subscribe()
    }

    /// Latest resolved address.
    pub fn address(&self) -> watch::Receiver<ResolvedAddress> {
        self.address_tx.subscribe()
    }

    pub fn state(&self) -> watch::Receiver<ReporterState> {
        self.state_tx.subscribe()
    }

    /// Start tracking for `agent`.
    ///
    /// - no agent: stays idle, nothing is prompted
    /// - foreground permission refused: `PermissionDenied`, never prompted again
    /// - background permission is requested but not required
    ///
    /// Returns the resulting state. Calling this while tracking is a no-op.
    pub async fn start(&mut self, agent: Option<&AgentIdentity>) -> ScoutResult<ReporterState> {
        let current = *self.state_tx.borrow();
        match current {
            ReporterState::Tracking | ReporterState::PermissionDenied => return Ok(current),
            ReporterState::Idle | ReporterState::WatchEnded => {}
        }

        let Some(agent) = agent else {
            debug!("[reporter] no signed-in agent, staying idle");
            return Ok(current);
        };

        // A previous watch may have ended on its own; reap its task.
        self.join_task().await;

        let foreground = self.provider.request_foreground_permission().await;
        if !foreground.is_granted() {
            info!("[reporter] foreground location permission {foreground}, reporter disabled");
            self.state_tx.send_replace(ReporterState::PermissionDenied);
            return Ok(ReporterState::PermissionDenied);
        }

        match self.provider.request_background_permission().await {
            Ok(status) if status.is_granted() => debug!("[reporter] background location granted"),
            Ok(status) => warn!("[reporter] background location {status}, foreground tracking only"),
            Err(e) => warn!("[reporter] background permission request failed: {e}"),
        }

        let samples = self.provider.watch_position(self.config.watch).await?;

        let ctx = SampleContext {
            agent_id: agent.agent_id.clone(),
            gate: GeocodeGate::new(self.config.geocode_threshold_m),
            geocoder: Arc::clone(&self.geocoder),
            sink: Arc::clone(&self.sink),
            position_tx: Arc::clone(&self.position_tx),
            address_tx: Arc::clone(&self.address_tx),
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state_tx = Arc::clone(&self.state_tx);

        info!(
            "[reporter] tracking agent {} (threshold={}m, watch={:?})",
            agent.agent_id, self.config.geocode_threshold_m, self.config.watch
        );
        self.state_tx.send_replace(ReporterState::Tracking);
        let task = tokio::spawn(sample_loop(ctx, samples, shutdown_rx, state_tx));

        self.shutdown_tx = Some(shutdown_tx);
        self.task = Some(task);
        Ok(ReporterState::Tracking)
    }

    /// Stop tracking and wait for the sample loop to exit.
    ///
    /// Geocode and upload tasks already in flight are left to finish.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        self.join_task().await;
        self.state_tx.send_if_modified(|state| match state {
            ReporterState::PermissionDenied | ReporterState::Idle => false,
            _ => {
                *state = ReporterState::Idle;
                true
            }
        });
    }

    async fn join_task(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

/// State owned by the sample loop.
struct SampleContext {
    agent_id: String,
    /// Previous position marker lives here and nowhere else.
    gate: GeocodeGate,
    geocoder: Arc<dyn Geocoder>,
    sink: Arc<dyn PositionSink>,
    position_tx: Arc<watch::Sender<Option<Position>>>,
    address_tx: Arc<watch::Sender<ResolvedAddress>>,
}

impl SampleContext {
    fn handle_sample(&mut self, position: Position) -> GateDecision {
        self.position_tx.send_replace(Some(position));

        let decision = self.gate.observe(position);
        if decision.should_geocode {
            debug!("[reporter] moved {:.0}m, resolving address", decision.distance_m.unwrap_or_default());
            let geocoder = Arc::clone(&self.geocoder);
            let address_tx = Arc::clone(&self.address_tx);
            tokio::spawn(async move {
                resolve_address(geocoder.as_ref(), position, &address_tx).await;
            });
        }

        let sink = Arc::clone(&self.sink);
        let report = LocationReport::now(&self.agent_id, position);
        tokio::spawn(async move {
            upload_report(sink.as_ref(), &report).await;
        });

        decision
    }
}

/// Main sample loop: one sample at a time until shutdown or the watch ends.
async fn sample_loop(
    mut ctx: SampleContext,
    mut samples: PositionStream,
    mut shutdown_rx: watch::Receiver<bool>,
    state_tx: Arc<watch::Sender<ReporterState>>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                info!("[reporter] shutdown signal received");
                return;
            }

            sample = samples.recv() => match sample {
                Some(position) => {
                    ctx.handle_sample(position);
                }
                None => {
                    warn!("[reporter] location watch ended by the platform");
                    state_tx.send_replace(ReporterState::WatchEnded);
                    return;
                }
            }
        }
    }
}

/// Reverse-geocode `position`; on failure the published address is kept.
///
/// Returns whether the address was replaced.
async fn resolve_address(
    geocoder: &dyn Geocoder,
    position: Position,
    address_tx: &watch::Sender<ResolvedAddress>,
) -> bool {
    match geocoder.reverse(position).await {
        Ok(address) => {
            debug!("[reporter] address for {position}: {address}");
            address_tx.send_replace(address);
            true
        }
        Err(e) => {
            warn!("[reporter] reverse geocode for {position} failed, keeping previous address: {e}");
            false
        }
    }
}

async fn upload_report(sink: &dyn PositionSink, report: &LocationReport) {
    if let Err(e) = sink.upload(report).await {
        warn!("[reporter] upload dropped: {e}");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use scout_core::error::ScoutError;
    use scout_core::geo::offset_north;
    use scout_core::PermissionStatus;
    use tokio::sync::mpsc;

    use super::*;
    use crate::provider::{ChannelLocationProvider, PositionFeed};

    const ORIGIN: Position = Position { latitude: 48.8566, longitude: 2.3522 };

    /// Geocoder answering from a script, `None` meaning failure.
    struct ScriptedGeocoder {
        answers: Mutex<Vec<Option<ResolvedAddress>>>,
        calls: AtomicUsize,
        called_tx: mpsc::UnboundedSender<Position>,
    }

    impl ScriptedGeocoder {
        fn new(mut answers: Vec<Option<ResolvedAddress>>) -> (Arc<Self>, mpsc::UnboundedReceiver<Position>) {
            answers.reverse();
            let (called_tx, called_rx) = mpsc::unbounded_channel();
            (Arc::new(Self { answers: Mutex::new(answers), calls: AtomicUsize::new(0), called_tx }), called_rx)
        }
    }

    #[async_trait]
    impl Geocoder for ScriptedGeocoder {
        async fn reverse(&self, position: Position) -> ScoutResult<ResolvedAddress> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _ = self.called_tx.send(position);
            match self.answers.lock().unwrap().pop().flatten() {
                Some(addr) => Ok(addr),
                None => Err(ScoutError::Geocode("scripted failure".into())),
            }
        }
    }

    /// Sink recording every report; optionally failing all of them.
    struct RecordingSink {
        fail: bool,
        tx: mpsc::UnboundedSender<LocationReport>,
    }

    #[async_trait]
    impl PositionSink for RecordingSink {
        async fn upload(&self, report: &LocationReport) -> ScoutResult<()> {
            let _ = self.tx.send(report.clone());
            if self.fail { Err(ScoutError::Upload("HTTP 503".into())) } else { Ok(()) }
        }
    }

    struct Harness {
        reporter: PositionReporter,
        feed: PositionFeed,
        geocoder: Arc<ScriptedGeocoder>,
        geocode_rx: mpsc::UnboundedReceiver<Position>,
        upload_rx: mpsc::UnboundedReceiver<LocationReport>,
    }

    fn harness(fg: PermissionStatus, answers: Vec<Option<ResolvedAddress>>, fail_uploads: bool) -> Harness {
        let (provider, feed) = ChannelLocationProvider::new(fg, PermissionStatus::Denied);
        let (geocoder, geocode_rx) = ScriptedGeocoder::new(answers);
        let (tx, upload_rx) = mpsc::unbounded_channel();
        let reporter = PositionReporter::new(
            ReporterConfig::with_base_url("https://crm.test"),
            Arc::new(provider),
            geocoder.clone(),
            Arc::new(RecordingSink { fail: fail_uploads, tx }),
        );
        Harness { reporter, feed, geocoder, geocode_rx, upload_rx }
    }

    async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
        tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.expect("timed out").expect("closed")
    }

    fn agent() -> AgentIdentity {
        AgentIdentity::new("agent-42")
    }

    #[tokio::test]
    async fn idle_without_agent() {
        let mut h = harness(PermissionStatus::Granted, vec![], false);
        assert_eq!(h.reporter.start(None).await.unwrap(), ReporterState::Idle);
        assert!(!h.feed.is_watching());
    }

    #[tokio::test]
    async fn denied_permission_is_sticky() {
        let mut h = harness(PermissionStatus::Denied, vec![], false);
        assert_eq!(h.reporter.start(Some(&agent())).await.unwrap(), ReporterState::PermissionDenied);
        assert!(!h.feed.is_watching());
        assert_eq!(h.reporter.start(Some(&agent())).await.unwrap(), ReporterState::PermissionDenied);
        h.reporter.stop().await;
        assert_eq!(*h.reporter.state().borrow(), ReporterState::PermissionDenied);
    }

    #[tokio::test]
    async fn background_denial_still_tracks() {
        let mut h = harness(PermissionStatus::Granted, vec![], false);
        assert_eq!(h.reporter.start(Some(&agent())).await.unwrap(), ReporterState::Tracking);
        assert!(h.feed.is_watching());
        // second start is a no-op
        assert_eq!(h.reporter.start(Some(&agent())).await.unwrap(), ReporterState::Tracking);
        h.reporter.stop().await;
        assert_eq!(*h.reporter.state().borrow(), ReporterState::Idle);
    }

    #[tokio::test]
    async fn every_sample_is_uploaded() {
        let mut h = harness(PermissionStatus::Granted, vec![], false);
        h.reporter.start(Some(&agent())).await.unwrap();

        let second = offset_north(&ORIGIN, 5.0);
        assert!(h.feed.push(ORIGIN).await);
        assert!(h.feed.push(second).await);

        let r1 = next(&mut h.upload_rx).await;
        let r2 = next(&mut h.upload_rx).await;
        let mut got = [(r1.latitude, r1.longitude), (r2.latitude, r2.longitude)];
        got.sort_by(|a, b| a.0.total_cmp(&b.0));
        assert_eq!(got, [(ORIGIN.latitude, ORIGIN.longitude), (second.latitude, second.longitude)]);
        assert_eq!(r1.agent_id, "agent-42");
        assert!(r1.timestamp.ends_with('Z'));
        h.reporter.stop().await;
    }

    #[tokio::test]
    async fn upload_failure_does_not_block_next_sample() {
        let mut h = harness(PermissionStatus::Granted, vec![], true);
        h.reporter.start(Some(&agent())).await.unwrap();
        let mut position = h.reporter.position();

        let b = offset_north(&ORIGIN, 20.0);
        h.feed.push(ORIGIN).await;
        next(&mut h.upload_rx).await;
        h.feed.push(b).await;
        next(&mut h.upload_rx).await;

        tokio::time::timeout(Duration::from_secs(5), position.wait_for(|p| *p == Some(b)))
            .await
            .expect("second sample not published")
            .unwrap();
        assert_eq!(*h.reporter.state().borrow(), ReporterState::Tracking);
        h.reporter.stop().await;
    }

    #[tokio::test]
    async fn far_move_resolves_address() {
        let lyon = ResolvedAddress::new("Lyon", "Rue de la République");
        let mut h = harness(PermissionStatus::Granted, vec![Some(lyon.clone())], false);
        h.reporter.start(Some(&agent())).await.unwrap();
        let mut address = h.reporter.address();

        let far = offset_north(&ORIGIN, 800.0);
        h.feed.push(ORIGIN).await;
        h.feed.push(far).await;

        assert_eq!(next(&mut h.geocode_rx).await, far);
        tokio::time::timeout(Duration::from_secs(5), address.wait_for(|a| *a == lyon))
            .await
            .expect("address not updated")
            .unwrap();
        h.reporter.stop().await;
        assert_eq!(h.geocoder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn single_sample_keeps_default_address() {
        let mut h = harness(PermissionStatus::Granted, vec![], false);
        h.reporter.start(Some(&agent())).await.unwrap();
        h.feed.push(ORIGIN).await;
        next(&mut h.upload_rx).await;
        h.reporter.stop().await;

        assert!(h.geocode_rx.try_recv().is_err());
        assert_eq!(h.geocoder.calls.load(Ordering::SeqCst), 0);
        assert!(h.reporter.address().borrow().is_unknown());
    }

    #[tokio::test]
    async fn geocode_failure_keeps_previous_address() {
        let lyon = ResolvedAddress::new("Lyon", "Rue de la République");
        let (geocoder, _calls) = ScriptedGeocoder::new(vec![Some(lyon.clone()), None]);
        let (address_tx, address_rx) = watch::channel(ResolvedAddress::default());

        assert!(resolve_address(geocoder.as_ref(), ORIGIN, &address_tx).await);
        assert_eq!(*address_rx.borrow(), lyon);

        assert!(!resolve_address(geocoder.as_ref(), offset_north(&ORIGIN, 900.0), &address_tx).await);
        assert_eq!(*address_rx.borrow(), lyon);
    }

    #[tokio::test]
    async fn geocode_failure_before_any_success_keeps_default() {
        let (geocoder, _calls) = ScriptedGeocoder::new(vec![None]);
        let (address_tx, address_rx) = watch::channel(ResolvedAddress::default());
        assert!(!resolve_address(geocoder.as_ref(), ORIGIN, &address_tx).await);
        assert!(address_rx.borrow().is_unknown());
    }

    #[tokio::test]
    async fn watch_end_is_reported_and_restartable() {
        let mut h = harness(PermissionStatus::Granted, vec![], false);
        h.reporter.start(Some(&agent())).await.unwrap();
        let mut state = h.reporter.state();

        h.feed.end_watch();
        tokio::time::timeout(Duration::from_secs(5), state.wait_for(|s| *s == ReporterState::WatchEnded))
            .await
            .expect("watch end not observed")
            .unwrap();

        assert_eq!(h.reporter.start(Some(&agent())).await.unwrap(), ReporterState::Tracking);
        assert!(h.feed.push(ORIGIN).await);
        next(&mut h.upload_rx).await;
        h.reporter.stop().await;
    }

    #[tokio::test]
    async fn handle_sample_measures_from_previous_sample() {
        let (geocoder, mut geocode_rx) = ScriptedGeocoder::new(vec![None, None]);
        let (upload_tx, _upload_rx) = mpsc::unbounded_channel();
        let mut ctx = SampleContext {
            agent_id: "a".into(),
            gate: GeocodeGate::new(500.0),
            geocoder,
            sink: Arc::new(RecordingSink { fail: false, tx: upload_tx }),
            position_tx: Arc::new(watch::channel(None).0),
            address_tx: Arc::new(watch::channel(ResolvedAddress::default()).0),
        };

        let a = ORIGIN;
        let b = offset_north(&a, 10.0);
        let c = offset_north(&b, 600.0);

        assert!(!ctx.handle_sample(a).should_geocode);
        assert!(!ctx.handle_sample(b).should_geocode);
        assert_eq!(ctx.gate.marker(), Some(b));
        let at_c = ctx.handle_sample(c);
        assert!(at_c.should_geocode);
        assert!((at_c.distance_m.unwrap() - 600.0).abs() < 1e-6);
        assert_eq!(*ctx.position_tx.borrow(), Some(c));

        assert_eq!(next(&mut geocode_rx).await, c);
    }
}
