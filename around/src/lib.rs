//! Around - walking look-up reminder engine
//!
//! Watches location, motion and screen signals and sends one "look around"
//! reminder when the user has been walking with an unlocked screen for a
//! while, away from home.
//!
//! # Modules
//!
//! - [`authorization`] - Permission status tracking
//! - [`location`] - Location subscription and home geofence evaluation
//! - [`motion`] - Debounced walking detection
//! - [`timer`] - Screen activity timer
//! - [`coordinator`] - The single task that serializes every event
//! - [`sources`] - Collaborator traits at the platform boundary
//! - [`prefs`] - Persisted preferences
//! - [`sim`] - Simulated collaborators and scenarios
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod authorization;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod location;
pub mod motion;
pub mod prefs;
pub mod sim;
pub mod sources;
pub mod timer;

/// Consecutive unlocked one-second samples before a reminder
pub const DEFAULT_THRESHOLD: u32 = 5;

/// Home radius in coordinate degrees, roughly one building footprint
pub const DEFAULT_RADIUS_DEGREES: f64 = 0.0002;

// Re-export commonly used types
pub use authorization::AuthorizationTracker;
pub use config::Config;
pub use coordinator::{
    Collaborators, CoordinatorConfig, ReminderCoordinator, ReminderEvent, ReminderHandle, ReminderRequest,
    ReminderSnapshot,
};
pub use domain::{
    ActivityKind, AuthorizationStatus, Coordinate, HomeGeofence, MotionState, ScreenState, TrackingSession,
};
pub use error::{LocationError, ReminderError, ReminderResult};
pub use location::{GeofenceTransition, LocationSubscriptionManager};
pub use motion::{MotionActivityMonitor, MotionTransition};
pub use prefs::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore, Preferences};
pub use sim::{Scenario, ScenarioReport};
pub use sources::{
    AuthorizationSource, EventSink, LocationSource, LocationUpdate, MotionSource, MotionUpdate, NotificationSink,
    ReminderNotification, ScreenStateQuery,
};
pub use timer::{ScreenActivityTimer, TimerState};
