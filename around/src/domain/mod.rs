//! Domain types shared by every component
//!
//! Plain values only: nothing in here owns a subscription or a timer.

mod geo;
mod session;
mod status;

pub use geo::{Coordinate, HomeGeofence};
pub use session::{ActivityKind, MotionState, ScreenState, TrackingSession};
pub use status::AuthorizationStatus;
