//! Tracking state machine.
//!
//! ```text
//!          launch (confirmation required)
//! Stopped ───────────────────────────────> AwaitingConfirmation
//!    │  ^                                       │         │
//!    │  │ decline / stop                        │ confirm │
//!    │  └───────────────────────────────────────┘         │
//!    │ start / launch                                     │
//!    └──────────────────> Tracking <──────────────────────┘
//!                            │ stop / shutdown
//!                            └────────────> Stopped
//! ```
//!
//! All mutation of the state and the persisted record goes through one
//! mutex. Fix handling and command handling therefore never interleave
//! partially: a fix delivered concurrently with `stop` is either fully
//! applied before the transition or fully discarded after it. Collector
//! pushes run on detached tasks and never hold that critical section
//! while a network call is outstanding.
//!
//! The controller is a single owned instance injected into both the
//! provider-callback path and the command-handling path; there are no
//! process-wide singletons.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error};

use crate::error::{CoreError, Result};
use crate::events::TrackingEvent;
use crate::fix::LocationFix;
use crate::notify::NotificationPresenter;
use crate::provider::{FixRequest, LocationProvider, ProviderSubscription};
use crate::sink::RemoteSink;
use crate::storage::{Config, StateStore};

/// Lagging event subscribers drop the oldest events past this depth.
const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    Stopped,
    /// The service was launched without an explicit command on a
    /// platform that requires user consent; an actionable prompt is
    /// showing. Collapses to `false` in the persisted tracking flag.
    AwaitingConfirmation,
    Tracking,
}

/// Query result for the last persisted coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LastLocation {
    pub latitude: f64,
    pub longitude: f64,
}

struct Current {
    state: TrackingState,
    subscription: Option<ProviderSubscription>,
}

struct Shared {
    current: Mutex<Current>,
    store: StateStore,
    provider: Arc<dyn LocationProvider>,
    presenter: Arc<dyn NotificationPresenter>,
    sink: RemoteSink,
    events: broadcast::Sender<TrackingEvent>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Current> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fix-handling protocol. Runs on the pump task for the active
    /// subscription; the state check under the lock makes a fix that
    /// arrives after `stop` a no-op.
    fn handle_fix(&self, fix: LocationFix) {
        let current = self.lock();
        if current.state != TrackingState::Tracking {
            debug!(
                latitude = fix.latitude,
                longitude = fix.longitude,
                "fix received while not tracking, discarded"
            );
            return;
        }
        if let Err(e) = self.store.record_fix(fix.latitude, fix.longitude) {
            error!(error = %e, "failed to persist fix");
        }
        // Only the enqueue happens under the lock; the POST itself runs
        // on a detached task.
        self.sink.spawn_push(fix);
        self.presenter.show_tracking(Some(&fix));
        let _ = self.events.send(TrackingEvent::LocationUpdated {
            latitude: fix.latitude,
            longitude: fix.longitude,
            at: fix.timestamp,
        });
    }
}

/// The tracking state machine. One instance per process, shared between
/// the command surface (bridge) and the provider callback path.
pub struct TrackingController {
    shared: Arc<Shared>,
    request: FixRequest,
    require_confirmation: bool,
}

impl TrackingController {
    /// Build a controller in the `Stopped` state.
    pub fn new(
        config: &Config,
        store: StateStore,
        provider: Arc<dyn LocationProvider>,
        presenter: Arc<dyn NotificationPresenter>,
        sink: RemoteSink,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                current: Mutex::new(Current {
                    state: TrackingState::Stopped,
                    subscription: None,
                }),
                store,
                provider,
                presenter,
                sink,
                events,
            }),
            request: FixRequest::from(&config.provider),
            require_confirmation: config.require_confirmation,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Service entry point without an explicit command (cold start by
    /// the platform). On confirmation-requiring platforms this shows the
    /// actionable prompt and waits; otherwise it starts tracking
    /// directly.
    pub fn launch(&self) -> Result<()> {
        let mut current = self.shared.lock();
        match current.state {
            TrackingState::Tracking => {
                debug!("launch ignored, tracking already active");
                Ok(())
            }
            TrackingState::AwaitingConfirmation => {
                debug!("launch ignored, confirmation already pending");
                Ok(())
            }
            TrackingState::Stopped => {
                if self.require_confirmation {
                    current.state = TrackingState::AwaitingConfirmation;
                    // The prompt is not tracking yet.
                    if let Err(e) = self.shared.store.set_tracking(false) {
                        error!(error = %e, "failed to persist tracking flag");
                    }
                    self.shared.presenter.show_confirmation_prompt();
                    Ok(())
                } else {
                    self.begin_tracking(&mut current)
                }
            }
        }
    }

    /// Explicit start command. Idempotent while already tracking.
    pub fn start(&self) -> Result<()> {
        let mut current = self.shared.lock();
        match current.state {
            TrackingState::Tracking => {
                debug!("start ignored, tracking already active");
                Ok(())
            }
            TrackingState::Stopped | TrackingState::AwaitingConfirmation => {
                self.begin_tracking(&mut current)
            }
        }
    }

    /// Affirmative answer to the confirmation prompt.
    pub fn confirm(&self) -> Result<()> {
        let mut current = self.shared.lock();
        match current.state {
            TrackingState::AwaitingConfirmation => self.begin_tracking(&mut current),
            _ => {
                debug!("confirm ignored, no confirmation pending");
                Ok(())
            }
        }
    }

    /// Negative answer to the confirmation prompt. The prompt is
    /// cleared and no subscription is created.
    pub fn decline(&self) {
        let mut current = self.shared.lock();
        if current.state == TrackingState::AwaitingConfirmation {
            current.state = TrackingState::Stopped;
            self.shared.presenter.clear();
        } else {
            debug!("decline ignored, no confirmation pending");
        }
    }

    /// Explicit stop command. Idempotent while already stopped.
    pub fn stop(&self) -> Result<()> {
        let mut current = self.shared.lock();
        match current.state {
            TrackingState::Stopped => {
                debug!("stop ignored, already stopped");
                Ok(())
            }
            TrackingState::AwaitingConfirmation => {
                current.state = TrackingState::Stopped;
                self.shared.presenter.clear();
                Ok(())
            }
            TrackingState::Tracking => {
                if let Some(sub) = current.subscription.take() {
                    sub.cancel();
                }
                current.state = TrackingState::Stopped;
                let persisted = self.shared.store.set_tracking(false);
                self.shared.presenter.clear();
                let _ = self.shared.events.send(TrackingEvent::TrackingStateChanged {
                    is_tracking: false,
                    at: Utc::now(),
                });
                persisted.map_err(CoreError::from)
            }
        }
    }

    /// Process-teardown path. Same effects as `stop`, errors logged.
    pub fn shutdown(&self) {
        if let Err(e) = self.stop() {
            error!(error = %e, "teardown: failed to persist stopped state");
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TrackingState {
        self.shared.lock().state
    }

    /// Persisted coordinates of the last applied fix, or
    /// [`CoreError::NotFound`] while the record still holds the
    /// sentinel zeros.
    pub fn last_sent_location(&self) -> Result<LastLocation> {
        match self.shared.store.last_location()? {
            Some((latitude, longitude)) => Ok(LastLocation {
                latitude,
                longitude,
            }),
            None => Err(CoreError::NotFound),
        }
    }

    /// Persisted tracking flag. `AwaitingConfirmation` reads as false.
    pub fn is_location_service_running(&self) -> Result<bool> {
        Ok(self.shared.store.is_tracking()?)
    }

    /// Event stream for the bridge/presentation layer.
    pub fn subscribe_events(&self) -> broadcast::Receiver<TrackingEvent> {
        self.shared.events.subscribe()
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Subscribe to the provider and enter `Tracking`. Reverts to
    /// `Stopped` if the subscription or the persistence of the flag
    /// fails.
    fn begin_tracking(&self, current: &mut Current) -> Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sub = match self.shared.provider.subscribe(self.request, tx) {
            Ok(sub) => sub,
            Err(e) => {
                current.state = TrackingState::Stopped;
                if let Err(se) = self.shared.store.set_tracking(false) {
                    error!(error = %se, "failed to persist tracking flag");
                }
                self.shared.presenter.clear();
                error!(error = %e, "provider subscription failed");
                return Err(e.into());
            }
        };
        if let Err(e) = self.shared.store.set_tracking(true) {
            sub.cancel();
            current.state = TrackingState::Stopped;
            self.shared.presenter.clear();
            return Err(e.into());
        }
        current.state = TrackingState::Tracking;
        current.subscription = Some(sub);

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            while let Some(fix) = rx.recv().await {
                shared.handle_fix(fix);
            }
        });

        self.shared.presenter.show_tracking(None);
        let _ = self.shared.events.send(TrackingEvent::TrackingStateChanged {
            is_tracking: true,
            at: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Provider that hands its delivery sender back to the test, so the
    /// test plays the role of the platform location client.
    #[derive(Default)]
    struct ManualProvider {
        senders: Mutex<Vec<mpsc::UnboundedSender<LocationFix>>>,
        subscriptions: AtomicUsize,
    }

    impl ManualProvider {
        fn sender(&self) -> mpsc::UnboundedSender<LocationFix> {
            self.senders
                .lock()
                .unwrap()
                .last()
                .cloned()
                .expect("no active subscription")
        }
    }

    impl LocationProvider for ManualProvider {
        fn subscribe(
            &self,
            _request: FixRequest,
            fixes: mpsc::UnboundedSender<LocationFix>,
        ) -> Result<ProviderSubscription, ProviderError> {
            self.subscriptions.fetch_add(1, Ordering::SeqCst);
            self.senders.lock().unwrap().push(fixes);
            Ok(ProviderSubscription::new(tokio::spawn(async {
                std::future::pending::<()>().await
            })))
        }
    }

    struct DeniedProvider;

    impl LocationProvider for DeniedProvider {
        fn subscribe(
            &self,
            _request: FixRequest,
            _fixes: mpsc::UnboundedSender<LocationFix>,
        ) -> Result<ProviderSubscription, ProviderError> {
            Err(ProviderError::PermissionDenied)
        }
    }

    /// Presenter that records the last rendering.
    #[derive(Default)]
    struct RecordingPresenter {
        last: Mutex<Option<String>>,
    }

    impl RecordingPresenter {
        fn last(&self) -> Option<String> {
            self.last.lock().unwrap().clone()
        }
    }

    impl NotificationPresenter for RecordingPresenter {
        fn show_confirmation_prompt(&self) {
            *self.last.lock().unwrap() = Some("prompt".into());
        }
        fn show_tracking(&self, fix: Option<&LocationFix>) {
            *self.last.lock().unwrap() = Some(match fix {
                Some(f) => format!("tracking {} {}", f.latitude, f.longitude),
                None => "tracking".into(),
            });
        }
        fn clear(&self) {
            *self.last.lock().unwrap() = None;
        }
    }

    struct Fixture {
        controller: TrackingController,
        provider: Arc<ManualProvider>,
        presenter: Arc<RecordingPresenter>,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        // Nothing listens on the sink endpoint; pushes fail fast and
        // are dropped, which is exactly the fire-and-forget contract.
        let provider = Arc::new(ManualProvider::default());
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::at(dir.path().join("state.toml"));
        let presenter = Arc::new(RecordingPresenter::default());
        let sink = RemoteSink::new("http://127.0.0.1:1/api/geo/add/", "test").unwrap();
        Fixture {
            controller: TrackingController::new(
                &Config::default(),
                store,
                provider.clone(),
                presenter.clone(),
                sink,
            ),
            provider,
            presenter,
            _dir: dir,
        }
    }

    async fn recv_event(
        rx: &mut broadcast::Receiver<TrackingEvent>,
    ) -> TrackingEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn start_subscribes_and_persists_flag() {
        let f = fixture();
        let mut events = f.controller.subscribe_events();

        f.controller.start().unwrap();
        assert_eq!(f.controller.state(), TrackingState::Tracking);
        assert!(f.controller.is_location_service_running().unwrap());
        assert_eq!(f.provider.subscriptions.load(Ordering::SeqCst), 1);

        match recv_event(&mut events).await {
            TrackingEvent::TrackingStateChanged { is_tracking, .. } => assert!(is_tracking),
            other => panic!("expected TrackingStateChanged, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn duplicate_start_is_a_noop() {
        let f = fixture();
        f.controller.start().unwrap();
        f.controller.start().unwrap();
        assert_eq!(f.controller.state(), TrackingState::Tracking);
        // No duplicate subscription.
        assert_eq!(f.provider.subscriptions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn duplicate_stop_is_a_noop() {
        let f = fixture();
        f.controller.stop().unwrap();
        f.controller.stop().unwrap();
        assert_eq!(f.controller.state(), TrackingState::Stopped);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fix_updates_store_presenter_and_events() {
        let f = fixture();
        let mut events = f.controller.subscribe_events();
        f.controller.start().unwrap();
        let _ = recv_event(&mut events).await; // TrackingStateChanged

        f.provider.sender().send(LocationFix::new(10.0, 20.0)).unwrap();
        match recv_event(&mut events).await {
            TrackingEvent::LocationUpdated {
                latitude,
                longitude,
                ..
            } => {
                assert_eq!(latitude, 10.0);
                assert_eq!(longitude, 20.0);
            }
            other => panic!("expected LocationUpdated, got {other:?}"),
        }

        let last = f.controller.last_sent_location().unwrap();
        assert_eq!(last.latitude, 10.0);
        assert_eq!(last.longitude, 20.0);
        assert_eq!(f.presenter.last().as_deref(), Some("tracking 10 20"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn late_fix_after_stop_is_discarded() {
        let f = fixture();
        let mut events = f.controller.subscribe_events();
        f.controller.start().unwrap();
        let _ = recv_event(&mut events).await;

        // Keep the delivery channel alive past the unsubscribe.
        let tx = f.provider.sender();
        f.controller.stop().unwrap();
        let _ = recv_event(&mut events).await; // TrackingStateChanged(false)

        tx.send(LocationFix::new(10.0, 20.0)).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(matches!(
            f.controller.last_sent_location(),
            Err(CoreError::NotFound)
        ));
        assert!(!f.controller.is_location_service_running().unwrap());
        assert!(events.try_recv().is_err(), "no LocationUpdated expected");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sentinel_fix_reads_as_not_found() {
        let f = fixture();
        let mut events = f.controller.subscribe_events();
        f.controller.start().unwrap();
        let _ = recv_event(&mut events).await;

        f.provider.sender().send(LocationFix::new(0.0, 0.0)).unwrap();
        let _ = recv_event(&mut events).await; // LocationUpdated still emitted

        assert!(matches!(
            f.controller.last_sent_location(),
            Err(CoreError::NotFound)
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn permission_denied_reverts_to_stopped() {
        let config = Config::default();
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::at(dir.path().join("state.toml"));
        let presenter = Arc::new(RecordingPresenter::default());
        let sink = RemoteSink::new("http://127.0.0.1:1/api/geo/add/", "test").unwrap();
        let controller = TrackingController::new(
            &config,
            store,
            Arc::new(DeniedProvider),
            presenter,
            sink,
        );

        let err = controller.start().unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied));
        assert_eq!(controller.state(), TrackingState::Stopped);
        assert!(!controller.is_location_service_running().unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn launch_with_confirmation_waits_for_consent() {
        let provider = Arc::new(ManualProvider::default());
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::at(dir.path().join("state.toml"));
        let presenter = Arc::new(RecordingPresenter::default());
        let sink = RemoteSink::new("http://127.0.0.1:1/api/geo/add/", "test").unwrap();
        let config = Config {
            require_confirmation: true,
            ..Config::default()
        };
        let controller = TrackingController::new(
            &config,
            store,
            provider.clone(),
            presenter.clone(),
            sink,
        );

        controller.launch().unwrap();
        assert_eq!(controller.state(), TrackingState::AwaitingConfirmation);
        assert_eq!(presenter.last().as_deref(), Some("prompt"));
        // The persisted flag collapses the pending prompt to false.
        assert!(!controller.is_location_service_running().unwrap());
        assert_eq!(provider.subscriptions.load(Ordering::SeqCst), 0);

        controller.confirm().unwrap();
        assert_eq!(controller.state(), TrackingState::Tracking);
        assert!(controller.is_location_service_running().unwrap());
        assert_eq!(provider.subscriptions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn decline_clears_prompt_without_subscribing() {
        let provider = Arc::new(ManualProvider::default());
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::at(dir.path().join("state.toml"));
        let presenter = Arc::new(RecordingPresenter::default());
        let sink = RemoteSink::new("http://127.0.0.1:1/api/geo/add/", "test").unwrap();
        let config = Config {
            require_confirmation: true,
            ..Config::default()
        };
        let controller = TrackingController::new(
            &config,
            store,
            provider.clone(),
            presenter.clone(),
            sink,
        );

        controller.launch().unwrap();
        controller.decline();
        assert_eq!(controller.state(), TrackingState::Stopped);
        assert_eq!(presenter.last(), None);
        assert_eq!(provider.subscriptions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn launch_without_confirmation_starts_directly() {
        let f = fixture();
        f.controller.launch().unwrap();
        assert_eq!(f.controller.state(), TrackingState::Tracking);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn shutdown_clears_state_and_presenter() {
        let f = fixture();
        f.controller.start().unwrap();
        f.controller.shutdown();
        assert_eq!(f.controller.state(), TrackingState::Stopped);
        assert!(!f.controller.is_location_service_running().unwrap());
        assert_eq!(f.presenter.last(), None);
    }

    mod sequences {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            /// State equals Tracking iff the last command was start;
            /// duplicates are no-ops.
            #[test]
            fn state_follows_last_command(commands in proptest::collection::vec(any::<bool>(), 0..24)) {
                let rt = tokio::runtime::Builder::new_multi_thread()
                    .enable_all()
                    .build()
                    .unwrap();
                rt.block_on(async {
                    let f = fixture();
                    for &start in &commands {
                        if start {
                            f.controller.start().unwrap();
                        } else {
                            f.controller.stop().unwrap();
                        }
                    }
                    let expect_tracking = commands.last().copied().unwrap_or(false);
                    prop_assert_eq!(
                        f.controller.state() == TrackingState::Tracking,
                        expect_tracking
                    );
                    prop_assert_eq!(
                        f.controller.is_location_service_running().unwrap(),
                        expect_tracking
                    );
                    Ok(())
                })?;
            }
        }
    }
}
