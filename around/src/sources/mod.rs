//! External collaborators at their interface boundary
//!
//! Platform providers push events into the coordinator through an
//! [`EventSink`] handed to them on `start`/`subscribe`. Each sink is bound to
//! one subscription generation, so anything a provider delivers after it was
//! stopped is recognised as stale and dropped by the coordinator.

mod notify;
mod sink;

use serde::{Deserialize, Serialize};

use crate::domain::{ActivityKind, AuthorizationStatus, Coordinate, ScreenState};
use crate::error::{LocationError, ReminderResult};

pub use notify::{NotificationSink, ReminderNotification};
pub use sink::EventSink;

/// One delivery from the location provider
#[derive(Debug, Clone, PartialEq)]
pub enum LocationUpdate {
    Fix(Coordinate),
    Failed(LocationError),
}

/// One delivery from the motion classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionUpdate {
    Classified(ActivityKind),
    /// The classifier is not available on this device
    Unavailable,
}

/// Permission-change provider
///
/// At most one subscriber; a new `subscribe` replaces the previous sink.
pub trait AuthorizationSource: Send + Sync {
    /// Current status, read synchronously
    fn current(&self) -> AuthorizationStatus;

    /// Register the sink that receives every subsequent status change
    fn subscribe(&self, sink: EventSink<AuthorizationStatus>);

    /// Show the system prompt for background location permission
    fn request_always_authorization(&self);
}

/// Position-fix provider
pub trait LocationSource: Send + Sync {
    /// Begin delivering fixes to `sink`, replacing any previous target
    fn start(&self, sink: EventSink<LocationUpdate>) -> ReminderResult<()>;

    /// Stop delivering; safe to call when not started
    fn stop(&self);
}

/// Activity classifier
pub trait MotionSource: Send + Sync {
    fn is_available(&self) -> bool;

    fn start(&self, sink: EventSink<MotionUpdate>) -> ReminderResult<()>;

    fn stop(&self);
}

/// Synchronous screen lock query
pub trait ScreenStateQuery: Send + Sync {
    fn sample(&self) -> ScreenState;
}
