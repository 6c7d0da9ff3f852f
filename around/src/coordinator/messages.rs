//! Message types for the reminder coordinator

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::domain::{AuthorizationStatus, Coordinate, HomeGeofence, MotionState, TrackingSession};
use crate::error::ReminderResult;
use crate::location::GeofenceTransition;
use crate::motion::MotionTransition;
use crate::sources::{LocationUpdate, MotionUpdate};

/// Everything the coordinator task processes
#[derive(Debug)]
pub enum ReminderRequest {
    /// Subscribe to authorization updates, prompting if undetermined
    RequestAuthorization {
        reply: oneshot::Sender<AuthorizationStatus>,
    },

    /// Set or replace the home geofence center
    SetHomeLocation {
        coordinate: Coordinate,
        reply: oneshot::Sender<ReminderResult<HomeGeofence>>,
    },

    /// Remove the home geofence
    ClearHomeLocation { reply: oneshot::Sender<ReminderResult<()>> },

    /// Turn tracking on or off
    SetTrackingEnabled {
        enabled: bool,
        reply: oneshot::Sender<ReminderResult<()>>,
    },

    /// Read-only view of the current state
    GetSnapshot { reply: oneshot::Sender<ReminderSnapshot> },

    /// Permission change from the authorization source
    Authorization { generation: u64, status: AuthorizationStatus },

    /// Fix or failure from the location source
    Location { generation: u64, update: LocationUpdate },

    /// Classification from the motion source
    Motion { generation: u64, update: MotionUpdate },

    /// Screen timer tick (internal)
    Tick { generation: u64 },

    /// Shutdown the coordinator
    Shutdown,
}

/// Observation feed for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ReminderEvent {
    AuthorizationChanged {
        from: AuthorizationStatus,
        to: AuthorizationStatus,
    },
    TrackingChanged {
        enabled: bool,
    },
    HomeChanged {
        home: Option<HomeGeofence>,
    },
    Geofence {
        transition: GeofenceTransition,
    },
    MotionTrackingStarted,
    MotionTrackingStopped,
    Motion {
        transition: MotionTransition,
    },
    ScreenTimerStarted,
    ScreenTimerStopped,
    ReminderSent {
        id: String,
    },
    SourceFailed {
        source: String,
        error: String,
    },
}

/// Read-only view of coordinator state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderSnapshot {
    pub authorization: AuthorizationStatus,
    #[serde(rename = "tracking-enabled")]
    pub tracking_enabled: bool,
    pub home: Option<HomeGeofence>,
    #[serde(rename = "last-location")]
    pub last_location: Option<Coordinate>,
    #[serde(rename = "location-active")]
    pub location_active: bool,
    #[serde(rename = "inside-home")]
    pub inside_home: Option<bool>,
    pub motion: MotionState,
    #[serde(rename = "motion-available")]
    pub motion_available: bool,
    pub session: TrackingSession,
    #[serde(rename = "reminders-sent")]
    pub reminders_sent: u64,
}
