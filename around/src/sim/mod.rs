//! Simulated platform collaborators
//!
//! In-process stand-ins for the OS permission, location, motion, screen and
//! notification services. Tests drive them directly; the CLI drives them
//! from a YAML [`Scenario`].

mod notify;
mod scenario;
mod sources;

pub use notify::{LogNotificationSink, RecordingNotificationSink};
pub use scenario::{Scenario, ScenarioReport, Step};
pub use sources::{SimAuthorizationSource, SimLocationSource, SimMotionSource, SimScreen};
