//! Scripted simulation runs
//!
//! A scenario is a YAML list of steps replayed against a live coordinator
//! wired to simulated collaborators:
//!
//! ```yaml
//! authorization: authorized-always
//! steps:
//!   - tracking: true
//!   - home: { latitude: 43.4723, longitude: -80.5449 }
//!   - fix: { latitude: 43.4800, longitude: -80.5449 }
//!   - activity: walking
//!   - wait-ms: 5500
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use super::sources::{SimAuthorizationSource, SimLocationSource, SimMotionSource, SimScreen};
use crate::config::Config;
use crate::coordinator::{Collaborators, ReminderCoordinator, ReminderEvent, ReminderHandle, ReminderSnapshot};
use crate::domain::{ActivityKind, AuthorizationStatus, Coordinate, ScreenState};
use crate::error::{LocationError, ReminderResult};
use crate::prefs::MemoryPreferenceStore;
use crate::sources::NotificationSink;

/// One scripted action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    /// The user asks for location permission
    RequestAuthorization,
    /// The platform reports a new permission status
    Authorize(AuthorizationStatus),
    Tracking(bool),
    Home(Coordinate),
    ClearHome,
    Fix(Coordinate),
    /// Location provider failure; `not-authorized` or any other message
    LocationError(String),
    Activity(ActivityKind),
    MotionUnavailable,
    Screen(ScreenState),
    WaitMs(u64),
}

/// A complete simulation script
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub name: Option<String>,

    /// Permission status when the coordinator starts
    pub authorization: AuthorizationStatus,

    /// Status the simulated user picks when prompted
    pub grant: Option<AuthorizationStatus>,

    /// Whether the device has an activity classifier
    #[serde(rename = "motion-available")]
    pub motion_available: Option<bool>,

    /// Steps are written as single-key maps: `- tracking: true`
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub steps: Vec<Step>,
}

/// Outcome of a scenario run
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: Option<String>,
    pub steps: usize,
    pub events: Vec<ReminderEvent>,
    /// Intents the coordinator refused
    pub rejected: Vec<String>,
    pub snapshot: ReminderSnapshot,
}

impl ScenarioReport {
    pub fn reminders_sent(&self) -> u64 {
        self.snapshot.reminders_sent
    }
}

struct SimWorld {
    auth: Arc<SimAuthorizationSource>,
    location: Arc<SimLocationSource>,
    motion: Arc<SimMotionSource>,
    screen: Arc<SimScreen>,
}

impl Scenario {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).context(format!("Failed to read scenario {}", path.display()))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse scenario")
    }

    /// Replay every step and return the final state
    ///
    /// Preferences live in memory for the run, so a scenario never touches
    /// the persisted state.
    pub async fn run(&self, config: &Config, notifier: Arc<dyn NotificationSink>) -> Result<ScenarioReport> {
        info!(name = ?self.name, steps = self.steps.len(), "Running scenario");

        let world = SimWorld {
            auth: Arc::new(SimAuthorizationSource::new(self.authorization)),
            location: Arc::new(SimLocationSource::new()),
            motion: Arc::new(SimMotionSource::new(self.motion_available.unwrap_or(true))),
            screen: Arc::new(SimScreen::new(ScreenState::Unlocked)),
        };
        if let Some(grant) = self.grant {
            world.auth.grant_on_prompt(grant);
        }

        let coordinator = ReminderCoordinator::new(
            config,
            Collaborators {
                authorization: world.auth.clone(),
                location: world.location.clone(),
                motion: world.motion.clone(),
                screen: world.screen.clone(),
                notifier,
                preferences: Arc::new(MemoryPreferenceStore::new()),
            },
        );
        let handle = coordinator.handle();
        let mut feed = handle.subscribe();
        let task = tokio::spawn(coordinator.run());

        let mut events = Vec::new();
        let mut rejected = Vec::new();
        for (index, step) in self.steps.iter().enumerate() {
            debug!(index, ?step, "Scenario step");
            if let Err(e) = apply(step, &world, &handle).await {
                if e.is_user_visible() {
                    info!(index, ?step, error = %e, "Scenario step refused by permission policy");
                } else {
                    warn!(index, ?step, error = %e, "Scenario step rejected");
                }
                rejected.push(format!("step {}: {}", index + 1, e));
            }
            // Every step is fully handled before the next one starts
            handle.snapshot().await?;
            drain(&mut feed, &mut events);
        }

        let snapshot = handle.snapshot().await?;
        drain(&mut feed, &mut events);
        handle.shutdown().await?;
        task.await.context("Coordinator task failed")?;

        info!(reminders_sent = snapshot.reminders_sent, "Scenario complete");
        Ok(ScenarioReport {
            name: self.name.clone(),
            steps: self.steps.len(),
            events,
            rejected,
            snapshot,
        })
    }
}

async fn apply(step: &Step, world: &SimWorld, handle: &ReminderHandle) -> ReminderResult<()> {
    match step {
        Step::RequestAuthorization => {
            handle.request_authorization().await?;
        }
        Step::Authorize(status) => world.auth.set_status(*status).await,
        Step::Tracking(enabled) => handle.set_tracking_enabled(*enabled).await?,
        Step::Home(coordinate) => {
            handle.set_home_location(*coordinate).await?;
        }
        Step::ClearHome => handle.clear_home_location().await?,
        Step::Fix(coordinate) => world.location.emit_fix(*coordinate).await,
        Step::LocationError(message) => {
            let error = if message == "not-authorized" {
                LocationError::NotAuthorized
            } else {
                LocationError::Unknown(message.clone())
            };
            world.location.emit_failure(error).await;
        }
        Step::Activity(kind) => world.motion.emit(*kind).await,
        Step::MotionUnavailable => world.motion.emit_unavailable().await,
        Step::Screen(state) => world.screen.set(*state),
        Step::WaitMs(ms) => tokio::time::sleep(Duration::from_millis(*ms)).await,
    }
    Ok(())
}

fn drain(feed: &mut broadcast::Receiver<ReminderEvent>, events: &mut Vec<ReminderEvent>) {
    loop {
        match feed.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(skipped)) => warn!(skipped, "Scenario event feed lagged"),
            Err(_) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::RecordingNotificationSink;

    const WALK: &str = r#"
name: walk
authorization: authorized-always
steps:
  - tracking: true
  - home: { latitude: 43.0, longitude: -80.0 }
  - fix: { latitude: 43.01, longitude: -80.0 }
  - activity: walking
  - wait-ms: 5500
"#;

    #[test]
    fn test_parse_steps() {
        let scenario = Scenario::from_yaml(WALK).unwrap();
        assert_eq!(scenario.name.as_deref(), Some("walk"));
        assert_eq!(scenario.authorization, AuthorizationStatus::AuthorizedAlways);
        assert_eq!(
            scenario.steps,
            vec![
                Step::Tracking(true),
                Step::Home(Coordinate::new(43.0, -80.0)),
                Step::Fix(Coordinate::new(43.01, -80.0)),
                Step::Activity(ActivityKind::Walking),
                Step::WaitMs(5500),
            ]
        );
    }

    #[test]
    fn test_parse_unit_steps() {
        let yaml = "steps:\n  - request-authorization\n  - clear-home\n  - motion-unavailable\n";
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.authorization, AuthorizationStatus::Undetermined);
        assert_eq!(
            scenario.steps,
            vec![Step::RequestAuthorization, Step::ClearHome, Step::MotionUnavailable]
        );
    }

    #[test]
    fn test_unknown_step_rejected() {
        assert!(Scenario::from_yaml("steps:\n  - teleport: true\n").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_walk_scenario_sends_reminder() {
        let scenario = Scenario::from_yaml(WALK).unwrap();
        let notifier = Arc::new(RecordingNotificationSink::new());

        let report = scenario.run(&Config::default(), notifier.clone()).await.unwrap();
        assert_eq!(report.reminders_sent(), 1);
        assert!(report.rejected.is_empty());
        assert!(report.events.contains(&ReminderEvent::ScreenTimerStarted));
        assert!(
            report
                .events
                .iter()
                .any(|event| matches!(event, ReminderEvent::ReminderSent { .. }))
        );
        assert_eq!(notifier.count(), 1);
    }

    #[tokio::test]
    async fn test_rejected_intent_is_reported() {
        let scenario = Scenario::from_yaml("authorization: denied\nsteps:\n  - tracking: true\n").unwrap();
        let report = scenario
            .run(&Config::default(), Arc::new(RecordingNotificationSink::new()))
            .await
            .unwrap();

        assert_eq!(report.rejected.len(), 1);
        assert!(report.rejected[0].contains("Permission denied"));
        assert!(!report.snapshot.tracking_enabled);
    }

    #[tokio::test]
    async fn test_prompt_grant_allows_tracking() {
        let yaml = "grant: authorized-always\nsteps:\n  - request-authorization\n  - tracking: true\n";
        let report = Scenario::from_yaml(yaml)
            .unwrap()
            .run(&Config::default(), Arc::new(RecordingNotificationSink::new()))
            .await
            .unwrap();

        assert!(report.rejected.is_empty(), "rejected: {:?}", report.rejected);
        assert_eq!(report.snapshot.authorization, AuthorizationStatus::AuthorizedAlways);
        assert!(report.snapshot.tracking_enabled);
        assert!(report.snapshot.location_active);
    }
}
