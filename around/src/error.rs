//! Error types for the reminder engine

use thiserror::Error;

use crate::domain::{AuthorizationStatus, Coordinate};

/// Failures reported by the location source; both end the subscription
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("Location permission denied by provider")]
    NotAuthorized,

    #[error("Location provider failure: {0}")]
    Unknown(String),
}

/// Errors surfaced by the reminder engine
#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("Permission denied (authorization: {0})")]
    PermissionDenied(AuthorizationStatus),

    #[error("Coordinate out of range: {0}")]
    InvalidCoordinate(Coordinate),

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Notification delivery failed: {0}")]
    DeliveryFailure(String),

    #[error("Preference store error: {0}")]
    Preferences(String),

    #[error("Channel error")]
    ChannelError,
}

impl ReminderError {
    /// Permission problems are the only errors shown to the user
    pub fn is_user_visible(&self) -> bool {
        matches!(self, ReminderError::PermissionDenied(_))
    }
}

impl From<LocationError> for ReminderError {
    fn from(err: LocationError) -> Self {
        match err {
            LocationError::NotAuthorized => ReminderError::PermissionDenied(AuthorizationStatus::Denied),
            LocationError::Unknown(message) => ReminderError::SourceUnavailable(message),
        }
    }
}

/// Response from reminder operations
pub type ReminderResult<T> = Result<T, ReminderError>;
