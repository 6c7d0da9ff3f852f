//! Integration tests for Around
//!
//! These drive a live coordinator through simulated sensors, end to end.

use std::sync::Arc;
use std::time::Duration;

use around::config::Config;
use around::coordinator::{Collaborators, ReminderCoordinator, ReminderEvent, ReminderHandle};
use around::domain::{ActivityKind, AuthorizationStatus, Coordinate, ScreenState};
use around::prefs::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore};
use around::sim::{
    RecordingNotificationSink, Scenario, ScenarioReport, SimAuthorizationSource, SimLocationSource, SimMotionSource,
    SimScreen,
};
use around::sources::{LocationUpdate, MotionUpdate};
use proptest::prelude::*;
use tempfile::TempDir;
use tokio::task::JoinHandle;

struct World {
    auth: Arc<SimAuthorizationSource>,
    location: Arc<SimLocationSource>,
    motion: Arc<SimMotionSource>,
    screen: Arc<SimScreen>,
    notifier: Arc<RecordingNotificationSink>,
}

impl World {
    fn new() -> Self {
        Self {
            auth: Arc::new(SimAuthorizationSource::new(AuthorizationStatus::AuthorizedAlways)),
            location: Arc::new(SimLocationSource::new()),
            motion: Arc::new(SimMotionSource::new(true)),
            screen: Arc::new(SimScreen::new(ScreenState::Unlocked)),
            notifier: Arc::new(RecordingNotificationSink::new()),
        }
    }

    fn spawn_with(&self, config: &Config, preferences: Arc<dyn PreferenceStore>) -> (ReminderHandle, JoinHandle<()>) {
        let coordinator = ReminderCoordinator::new(
            config,
            Collaborators {
                authorization: self.auth.clone(),
                location: self.location.clone(),
                motion: self.motion.clone(),
                screen: self.screen.clone(),
                notifier: self.notifier.clone(),
                preferences,
            },
        );
        let handle = coordinator.handle();
        (handle, tokio::spawn(coordinator.run()))
    }

    fn spawn(&self) -> (ReminderHandle, JoinHandle<()>) {
        self.spawn_with(&Config::default(), Arc::new(MemoryPreferenceStore::new()))
    }

    /// Tracking on, one fix away from home, walking
    async fn start_walking(&self, handle: &ReminderHandle) {
        handle.set_tracking_enabled(true).await.unwrap();
        self.location.emit_fix(Coordinate::new(43.5, -80.5)).await;
        handle.snapshot().await.unwrap();
        self.motion.emit(ActivityKind::Walking).await;
        handle.snapshot().await.unwrap();
    }
}

async fn stop(handle: ReminderHandle, task: JoinHandle<()>) {
    handle.shutdown().await.unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), task).await;
    assert!(result.is_ok(), "Coordinator should shut down gracefully");
}

// =============================================================================
// Reminder Scenarios
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_five_unlocked_ticks_send_exactly_one_reminder() {
    let world = World::new();
    let (handle, task) = world.spawn();
    world.start_walking(&handle).await;

    tokio::time::sleep(Duration::from_millis(4500)).await;
    assert_eq!(world.notifier.count(), 0, "Must not fire at four ticks");

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(world.notifier.count(), 1);

    // Still walking, still unlocked, no new walking transition
    world.motion.emit(ActivityKind::Walking).await;
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(world.notifier.count(), 1);

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.reminders_sent, 1);
    assert!(!snapshot.session.screen_timer_active);

    stop(handle, task).await;
}

#[tokio::test(start_paused = true)]
async fn test_lock_discards_elapsed_ticks() {
    let world = World::new();
    let (handle, task) = world.spawn();
    world.start_walking(&handle).await;

    // Three unlocked ticks
    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(handle.snapshot().await.unwrap().session.elapsed_ticks, 3);

    // Fourth tick sees the lock
    world.screen.set(ScreenState::Locked);
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(handle.snapshot().await.unwrap().session.elapsed_ticks, 0);

    // Four unlocked ticks on the fresh window are not enough
    world.screen.set(ScreenState::Unlocked);
    tokio::time::sleep(Duration::from_millis(4000)).await;
    assert_eq!(world.notifier.count(), 0);

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(world.notifier.count(), 1);

    stop(handle, task).await;
}

#[tokio::test(start_paused = true)]
async fn test_stopping_walk_stops_timer() {
    let world = World::new();
    let (handle, task) = world.spawn();
    world.start_walking(&handle).await;

    tokio::time::sleep(Duration::from_millis(2500)).await;
    world.motion.emit(ActivityKind::Automotive).await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    let snapshot = handle.snapshot().await.unwrap();
    assert!(!snapshot.session.screen_timer_active);
    assert_eq!(snapshot.reminders_sent, 0);

    stop(handle, task).await;
}

#[tokio::test(start_paused = true)]
async fn test_entering_home_stops_motion_and_timer() {
    let world = World::new();
    let (handle, task) = world.spawn();
    handle.set_home_location(Coordinate::new(43.5, -80.5)).await.unwrap();

    handle.set_tracking_enabled(true).await.unwrap();
    world.location.emit_fix(Coordinate::new(43.6, -80.5)).await;
    handle.snapshot().await.unwrap();
    world.motion.emit(ActivityKind::Walking).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert!(snapshot.session.motion_subscription_active);
    assert!(snapshot.session.screen_timer_active);

    world.location.emit_fix(Coordinate::new(43.5001, -80.5001)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.inside_home, Some(true));
    assert!(!snapshot.session.motion_subscription_active);
    assert!(!snapshot.session.screen_timer_active);
    assert!(!world.motion.is_active());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(world.notifier.count(), 0);

    // Leaving again resumes motion tracking
    world.location.emit_fix(Coordinate::new(43.6, -80.5)).await;
    assert!(handle.snapshot().await.unwrap().session.motion_subscription_active);

    stop(handle, task).await;
}

#[tokio::test(start_paused = true)]
async fn test_disable_tracking_ignores_in_flight_events() {
    let world = World::new();
    let (handle, task) = world.spawn();
    world.start_walking(&handle).await;

    let stale_location = world.location.last_sink().unwrap();
    let stale_motion = world.motion.last_sink().unwrap();

    handle.set_tracking_enabled(false).await.unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert!(!snapshot.location_active);
    assert!(!snapshot.session.motion_subscription_active);
    assert!(!snapshot.session.screen_timer_active);

    // Deliveries that were already on their way when tracking stopped
    stale_location
        .send(LocationUpdate::Fix(Coordinate::new(43.7, -80.5)))
        .await
        .unwrap();
    stale_motion
        .send(MotionUpdate::Classified(ActivityKind::Walking))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.last_location, None);
    assert!(!snapshot.session.motion_subscription_active);
    assert!(!snapshot.session.screen_timer_active);
    assert_eq!(world.motion.start_count(), 1);
    assert_eq!(world.notifier.count(), 0);

    stop(handle, task).await;
}

#[tokio::test(start_paused = true)]
async fn test_permission_revoked_mid_walk() {
    let world = World::new();
    let (handle, task) = world.spawn();
    world.start_walking(&handle).await;

    world.auth.set_status(AuthorizationStatus::Denied).await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.authorization, AuthorizationStatus::Denied);
    assert!(!snapshot.tracking_enabled);
    assert!(!snapshot.location_active);
    assert_eq!(world.notifier.count(), 0);

    stop(handle, task).await;
}

#[tokio::test(start_paused = true)]
async fn test_classifier_lost_mid_walk_stops_timer_for_session() {
    let world = World::new();
    let (handle, task) = world.spawn();
    world.start_walking(&handle).await;

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(handle.snapshot().await.unwrap().session.screen_timer_active);

    world.motion.emit_unavailable().await;
    let snapshot = handle.snapshot().await.unwrap();
    assert!(!snapshot.motion_available);
    assert!(!snapshot.session.motion_subscription_active);
    assert!(!snapshot.session.screen_timer_active);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(world.notifier.count(), 0);

    // Later fixes outside home do not bring the classifier back
    world.location.emit_fix(Coordinate::new(43.6, -80.5)).await;
    world.location.emit_fix(Coordinate::new(43.7, -80.5)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert!(!snapshot.session.motion_subscription_active);
    assert_eq!(world.motion.start_count(), 1);
    assert_eq!(world.notifier.count(), 0);

    stop(handle, task).await;
}

// =============================================================================
// Bundled Scenarios
// =============================================================================

async fn run_bundled(name: &str) -> ScenarioReport {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(name);
    let scenario = Scenario::from_file(&path).unwrap();
    let report = scenario
        .run(&Config::default(), Arc::new(RecordingNotificationSink::new()))
        .await
        .unwrap();
    assert!(report.rejected.is_empty(), "{}: {:?}", name, report.rejected);
    report
}

#[tokio::test(start_paused = true)]
async fn test_bundled_walk_scenario() {
    let report = run_bundled("walk.yml").await;
    assert_eq!(report.reminders_sent(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_bundled_lock_reset_scenario() {
    let report = run_bundled("lock-reset.yml").await;
    assert_eq!(report.reminders_sent(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_bundled_home_scenario() {
    let report = run_bundled("home.yml").await;
    assert_eq!(report.reminders_sent(), 0);
    assert!(report.events.contains(&ReminderEvent::MotionTrackingStopped));
    assert_eq!(report.snapshot.inside_home, Some(true));
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn test_preferences_survive_restart() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("preferences.json");
    let world = World::new();

    let store = Arc::new(FilePreferenceStore::open(&path).unwrap());
    let (handle, task) = world.spawn_with(&Config::default(), store);
    handle.set_home_location(Coordinate::new(51.5, -0.12)).await.unwrap();
    handle.set_tracking_enabled(true).await.unwrap();
    stop(handle, task).await;

    let store = Arc::new(FilePreferenceStore::open(&path).unwrap());
    let (handle, task) = world.spawn_with(&Config::default(), store);
    let snapshot = handle.snapshot().await.unwrap();
    assert!(snapshot.tracking_enabled);
    assert!(snapshot.location_active);
    assert_eq!(snapshot.home.map(|home| home.center), Some(Coordinate::new(51.5, -0.12)));

    stop(handle, task).await;
}

// =============================================================================
// Properties
// =============================================================================

fn any_kind() -> impl Strategy<Value = ActivityKind> {
    prop::sample::select(vec![
        ActivityKind::Walking,
        ActivityKind::Stationary,
        ActivityKind::Running,
        ActivityKind::Automotive,
        ActivityKind::Cycling,
        ActivityKind::Unknown,
    ])
}

/// Timer state after each classification, with ticks far enough apart that
/// none arrive during the run
fn timer_states(kinds: &[ActivityKind]) -> Vec<bool> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime");

    runtime.block_on(async {
        let mut config = Config::default();
        config.reminder.tick_interval_ms = 3_600_000;

        let world = World::new();
        let (handle, task) = world.spawn_with(&config, Arc::new(MemoryPreferenceStore::new()));
        handle.set_tracking_enabled(true).await.unwrap();
        world.location.emit_fix(Coordinate::new(0.0, 0.0)).await;
        handle.snapshot().await.unwrap();

        let mut states = Vec::new();
        for kind in kinds {
            world.motion.emit(*kind).await;
            states.push(handle.snapshot().await.unwrap().session.screen_timer_active);
        }
        stop(handle, task).await;
        states
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_timer_runs_iff_last_classification_was_walking(kinds in prop::collection::vec(any_kind(), 1..30)) {
        let states = timer_states(&kinds);
        for (kind, running) in kinds.iter().zip(states) {
            prop_assert_eq!(running, *kind == ActivityKind::Walking);
        }
    }
}
