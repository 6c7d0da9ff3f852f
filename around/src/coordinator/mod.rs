//! Reminder coordinator
//!
//! The only place state changes happen. Intents from the presentation layer
//! and events from every source are queued onto one channel and handled one
//! at a time, in arrival order, by a single task.

mod config;
mod core;
mod handle;
mod messages;

pub use config::CoordinatorConfig;
pub use self::core::{Collaborators, ReminderCoordinator};
pub use handle::ReminderHandle;
pub use messages::{ReminderEvent, ReminderRequest, ReminderSnapshot};
