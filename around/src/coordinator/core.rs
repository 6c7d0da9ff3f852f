//! Reminder coordinator task
//!
//! Every state mutation in the engine happens on this one task. Sources,
//! the tick timer and user intents all arrive as [`ReminderRequest`]s on a
//! single queue and are handled to completion, one at a time, in arrival
//! order.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use super::handle::ReminderHandle;
use super::messages::{ReminderEvent, ReminderRequest, ReminderSnapshot};
use crate::authorization::AuthorizationTracker;
use crate::config::{Config, ReminderConfig};
use crate::domain::{AuthorizationStatus, Coordinate, HomeGeofence, TrackingSession};
use crate::error::{ReminderError, ReminderResult};
use crate::location::{GeofenceTransition, LocationOutcome, LocationSubscriptionManager};
use crate::motion::{MotionActivityMonitor, MotionOutcome, MotionTransition};
use crate::prefs::{PreferenceStore, Preferences};
use crate::sources::{
    AuthorizationSource, LocationSource, LocationUpdate, MotionSource, MotionUpdate, NotificationSink,
    ReminderNotification, ScreenStateQuery,
};
use crate::timer::{ScreenActivityTimer, TickOutcome};

/// The platform services the coordinator drives
#[derive(Clone)]
pub struct Collaborators {
    pub authorization: Arc<dyn AuthorizationSource>,
    pub location: Arc<dyn LocationSource>,
    pub motion: Arc<dyn MotionSource>,
    pub screen: Arc<dyn ScreenStateQuery>,
    pub notifier: Arc<dyn NotificationSink>,
    pub preferences: Arc<dyn PreferenceStore>,
}

/// Owns the tracking session and serializes every event that touches it
pub struct ReminderCoordinator {
    config: Config,
    tx: mpsc::Sender<ReminderRequest>,
    rx: mpsc::Receiver<ReminderRequest>,
    event_tx: broadcast::Sender<ReminderEvent>,
    collaborators: Collaborators,
}

impl ReminderCoordinator {
    pub fn new(config: &Config, collaborators: Collaborators) -> Self {
        debug!("ReminderCoordinator::new: called");
        let (tx, rx) = mpsc::channel(config.coordinator.channel_buffer);
        let (event_tx, _) = broadcast::channel(config.coordinator.event_buffer);
        Self {
            config: config.clone(),
            tx,
            rx,
            event_tx,
            collaborators,
        }
    }

    /// Client handle for user intents and observation
    pub fn handle(&self) -> ReminderHandle {
        ReminderHandle::new(self.tx.clone(), self.event_tx.clone())
    }

    /// Run the coordinator task
    ///
    /// Consumes the coordinator and runs until a `Shutdown` request arrives.
    /// The loop keeps a sender of its own for event sinks and ticks, so
    /// dropping every handle does not end it.
    pub async fn run(mut self) {
        let mut state = CoordinatorState::new(&self.config, self.collaborators, self.tx.clone(), self.event_tx);
        state.startup();

        info!("Reminder coordinator started");

        while let Some(req) = self.rx.recv().await {
            match req {
                ReminderRequest::RequestAuthorization { reply } => {
                    let _ = reply.send(state.request_authorization());
                }

                ReminderRequest::SetHomeLocation { coordinate, reply } => {
                    let _ = reply.send(state.set_home_location(coordinate));
                }

                ReminderRequest::ClearHomeLocation { reply } => {
                    let _ = reply.send(state.clear_home_location());
                }

                ReminderRequest::SetTrackingEnabled { enabled, reply } => {
                    let _ = reply.send(state.set_tracking_enabled(enabled));
                }

                ReminderRequest::GetSnapshot { reply } => {
                    let _ = reply.send(state.snapshot());
                }

                ReminderRequest::Authorization { generation, status } => {
                    state.on_authorization(generation, status);
                }

                ReminderRequest::Location { generation, update } => {
                    state.on_location(generation, update);
                }

                ReminderRequest::Motion { generation, update } => {
                    state.on_motion(generation, update);
                }

                ReminderRequest::Tick { generation } => {
                    state.on_tick(generation);
                }

                ReminderRequest::Shutdown => {
                    info!("Reminder coordinator shutting down");
                    state.stop_all();
                    break;
                }
            }
        }

        info!(reminders_sent = state.reminders_sent, "Reminder coordinator stopped");
    }
}

/// Everything the coordinator task owns
struct CoordinatorState {
    tx: mpsc::Sender<ReminderRequest>,
    events: broadcast::Sender<ReminderEvent>,
    prefs: Preferences,
    screen: Arc<dyn ScreenStateQuery>,
    notifier: Arc<dyn NotificationSink>,
    authorization: AuthorizationTracker,
    location: LocationSubscriptionManager,
    motion: MotionActivityMonitor,
    timer: ScreenActivityTimer,
    reminder: ReminderConfig,
    radius_degrees: f64,
    tracking_enabled: bool,
    home: Option<HomeGeofence>,
    reminders_sent: u64,
}

impl CoordinatorState {
    fn new(
        config: &Config,
        collaborators: Collaborators,
        tx: mpsc::Sender<ReminderRequest>,
        events: broadcast::Sender<ReminderEvent>,
    ) -> Self {
        Self {
            tx,
            events,
            prefs: Preferences::new(collaborators.preferences),
            screen: collaborators.screen,
            notifier: collaborators.notifier,
            authorization: AuthorizationTracker::new(collaborators.authorization),
            location: LocationSubscriptionManager::new(collaborators.location),
            motion: MotionActivityMonitor::new(collaborators.motion),
            timer: ScreenActivityTimer::new(config.reminder.threshold, config.reminder.tick_interval()),
            reminder: config.reminder.clone(),
            radius_degrees: config.geofence.radius_degrees,
            tracking_enabled: false,
            home: None,
            reminders_sent: 0,
        }
    }

    /// Restore persisted preferences and resume tracking if allowed
    fn startup(&mut self) {
        self.request_notification_permission();

        self.tracking_enabled = self.prefs.tracking_enabled();
        self.home = self.prefs.home().map(|center| HomeGeofence::new(center, self.radius_degrees));
        info!(
            authorization = %self.authorization.status(),
            tracking_enabled = self.tracking_enabled,
            home = ?self.home,
            "Restored preferences"
        );

        if self.authorization.status() != AuthorizationStatus::Undetermined {
            let current = self.authorization.observe(&self.tx);
            self.record_authorization(current);
        }

        self.enforce_authorization();

        if self.tracking_enabled {
            self.start_location();
        }
    }

    fn request_notification_permission(&self) {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            match notifier.request_permission().await {
                Ok(()) => debug!("Notification permission granted"),
                Err(e) => warn!(error = %e, "Notification permission refused, reminders will not be delivered"),
            }
        });
    }

    fn request_authorization(&mut self) -> AuthorizationStatus {
        debug!("CoordinatorState::request_authorization: called");
        let current = self.authorization.observe(&self.tx);
        self.record_authorization(current);
        self.enforce_authorization();
        self.authorization.status()
    }

    fn set_home_location(&mut self, coordinate: Coordinate) -> ReminderResult<HomeGeofence> {
        debug!(%coordinate, "CoordinatorState::set_home_location: called");
        if !coordinate.is_valid() {
            warn!(?coordinate, "Rejecting invalid home location");
            return Err(ReminderError::InvalidCoordinate(coordinate));
        }
        let home = HomeGeofence::new(coordinate, self.radius_degrees);
        self.home = Some(home);
        info!(center = %coordinate, radius = self.radius_degrees, "Home location set");
        self.emit(ReminderEvent::HomeChanged { home: Some(home) });

        self.prefs
            .set_home(coordinate)
            .map_err(|e| ReminderError::Preferences(e.to_string()))?;
        Ok(home)
    }

    fn clear_home_location(&mut self) -> ReminderResult<()> {
        debug!("CoordinatorState::clear_home_location: called");
        if self.home.take().is_some() {
            info!("Home location cleared");
            self.emit(ReminderEvent::HomeChanged { home: None });
        }
        self.prefs
            .clear_home()
            .map_err(|e| ReminderError::Preferences(e.to_string()))
    }

    fn set_tracking_enabled(&mut self, enabled: bool) -> ReminderResult<()> {
        debug!(enabled, "CoordinatorState::set_tracking_enabled: called");
        if enabled {
            let status = self.authorization.status();
            if !status.permits_tracking() {
                warn!(%status, "Cannot enable tracking without background authorization");
                return Err(ReminderError::PermissionDenied(status));
            }
            let changed = self.set_tracking_flag(true);
            // Also restarts a location stream that ended with a provider failure
            let started = self.location.start(status, true, &self.tx);
            if let Err(e) = &started {
                error!(error = %e, "Failed to start location updates");
                self.emit(ReminderEvent::SourceFailed {
                    source: "location".to_string(),
                    error: e.to_string(),
                });
            }
            if changed {
                self.persist_tracking()?;
            }
            started.map(|_| ())
        } else {
            let changed = self.set_tracking_flag(false);
            self.stop_all();
            self.motion.reset_session();
            if changed {
                self.persist_tracking()?;
            }
            Ok(())
        }
    }

    fn on_authorization(&mut self, generation: u64, status: AuthorizationStatus) {
        debug!(generation, %status, "CoordinatorState::on_authorization: called");
        if let Some(previous) = self.authorization.on_status(generation, status) {
            self.emit(ReminderEvent::AuthorizationChanged {
                from: previous,
                to: status,
            });
            self.enforce_authorization();
        }
    }

    fn on_location(&mut self, generation: u64, update: LocationUpdate) {
        match self.location.on_update(generation, update, self.home.as_ref()) {
            LocationOutcome::Stale => {}
            LocationOutcome::Fix {
                inside_home, transition, ..
            } => {
                if let Some(transition) = transition {
                    info!(?transition, "Geofence transition");
                    self.emit(ReminderEvent::Geofence { transition });
                }
                if inside_home {
                    if transition == Some(GeofenceTransition::EnteredHome) {
                        self.stop_motion();
                    }
                } else {
                    self.start_motion();
                }
            }
            LocationOutcome::Failed(err) => {
                self.emit(ReminderEvent::SourceFailed {
                    source: "location".to_string(),
                    error: err.to_string(),
                });
                match ReminderError::from(err) {
                    ReminderError::PermissionDenied(_) => {
                        warn!("Location provider reported permission denial, stopping tracking");
                        self.stop_all();
                    }
                    other => warn!(error = %other, "Location updates ended"),
                }
            }
        }
    }

    fn on_motion(&mut self, generation: u64, update: MotionUpdate) {
        match self.motion.on_update(generation, update) {
            MotionOutcome::Stale | MotionOutcome::Suppressed => {}
            MotionOutcome::Transition(transition) => {
                self.emit(ReminderEvent::Motion { transition });
                match transition {
                    MotionTransition::StartedWalking => self.start_timer(),
                    MotionTransition::StoppedWalking => self.stop_timer(),
                }
            }
            MotionOutcome::Unavailable => {
                self.emit(ReminderEvent::SourceFailed {
                    source: "motion".to_string(),
                    error: "classifier unavailable".to_string(),
                });
                self.emit(ReminderEvent::MotionTrackingStopped);
                self.stop_timer();
            }
        }
    }

    fn on_tick(&mut self, generation: u64) {
        match self.timer.on_tick(generation, self.screen.as_ref(), &self.tx) {
            TickOutcome::Fire => {
                self.send_reminder();
                self.stop_timer();
            }
            TickOutcome::Stale | TickOutcome::Counted(_) | TickOutcome::Reset => {}
        }
    }

    /// Dispatch the reminder without waiting on the sink
    fn send_reminder(&mut self) {
        let notification = ReminderNotification::new(&self.reminder.title, &self.reminder.body);
        info!(id = %notification.id, "Sending look-around reminder");
        self.reminders_sent += 1;
        self.emit(ReminderEvent::ReminderSent {
            id: notification.id.clone(),
        });

        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            match notifier.send(&notification).await {
                Ok(()) => debug!(id = %notification.id, "Reminder delivered"),
                Err(e) => error!(id = %notification.id, error = %e, "Failed to deliver reminder"),
            }
        });
    }

    fn snapshot(&self) -> ReminderSnapshot {
        ReminderSnapshot {
            authorization: self.authorization.status(),
            tracking_enabled: self.tracking_enabled,
            home: self.home,
            last_location: self.location.last_fix(),
            location_active: self.location.is_active(),
            inside_home: self.location.inside_home(),
            motion: self.motion.state(),
            motion_available: !self.motion.is_unavailable(),
            session: TrackingSession {
                motion_subscription_active: self.motion.is_active(),
                screen_timer_active: self.timer.is_active(),
                elapsed_ticks: self.timer.elapsed_ticks(),
                threshold: self.timer.threshold(),
            },
            reminders_sent: self.reminders_sent,
        }
    }

    fn record_authorization(&mut self, status: AuthorizationStatus) {
        if let Some(previous) = self.authorization.apply(status) {
            self.emit(ReminderEvent::AuthorizationChanged {
                from: previous,
                to: status,
            });
        }
    }

    /// Anything short of background permission ends tracking
    fn enforce_authorization(&mut self) {
        let status = self.authorization.status();
        if status.permits_tracking() || !self.tracking_enabled {
            return;
        }
        warn!(%status, "Authorization insufficient, disabling location tracking");
        self.set_tracking_flag(false);
        self.stop_all();
        self.motion.reset_session();
        if let Err(e) = self.prefs.set_tracking_enabled(false) {
            warn!(error = %e, "Failed to persist tracking preference");
        }
    }

    fn set_tracking_flag(&mut self, enabled: bool) -> bool {
        if self.tracking_enabled == enabled {
            return false;
        }
        self.tracking_enabled = enabled;
        info!(enabled, "Location tracking toggled");
        self.emit(ReminderEvent::TrackingChanged { enabled });
        true
    }

    fn persist_tracking(&self) -> ReminderResult<()> {
        self.prefs
            .set_tracking_enabled(self.tracking_enabled)
            .map_err(|e| ReminderError::Preferences(e.to_string()))
    }

    fn start_location(&mut self) {
        if let Err(e) = self
            .location
            .start(self.authorization.status(), self.tracking_enabled, &self.tx)
        {
            error!(error = %e, "Failed to start location updates");
            self.emit(ReminderEvent::SourceFailed {
                source: "location".to_string(),
                error: e.to_string(),
            });
        }
    }

    fn start_motion(&mut self) {
        // Missing classifier is not retried until tracking is turned off
        if self.motion.is_unavailable() {
            return;
        }
        match self.motion.start(&self.tx) {
            Ok(true) => self.emit(ReminderEvent::MotionTrackingStarted),
            Ok(false) => {}
            Err(e) => self.emit(ReminderEvent::SourceFailed {
                source: "motion".to_string(),
                error: e.to_string(),
            }),
        }
    }

    /// Motion and everything downstream of it
    fn stop_motion(&mut self) {
        if self.motion.stop() {
            self.emit(ReminderEvent::MotionTrackingStopped);
        }
        self.stop_timer();
    }

    fn start_timer(&mut self) {
        if self.timer.start(&self.tx) {
            self.emit(ReminderEvent::ScreenTimerStarted);
        }
    }

    fn stop_timer(&mut self) {
        if self.timer.stop() {
            self.emit(ReminderEvent::ScreenTimerStopped);
        }
    }

    /// Cascading shutdown: location, then motion, then the timer
    fn stop_all(&mut self) {
        self.location.stop();
        self.stop_motion();
    }

    fn emit(&self, event: ReminderEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
