//! Persisted user preferences
//!
//! Read once at startup, written on every user-driven change. The store
//! itself is a plain key/value map; [`Preferences`] gives it types.

mod file;
mod memory;

use std::sync::Arc;

use eyre::Result;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::Coordinate;

pub use file::FilePreferenceStore;
pub use memory::MemoryPreferenceStore;

/// Key for the tracking-enabled flag
pub const TRACKING_KEY: &str = "locationTracking";

/// Key for the home center `{latitude, longitude}`
pub const HOME_KEY: &str = "homeCoordinate";

/// Key/value storage for preferences
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;

    fn set(&self, key: &str, value: Value) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// Typed access to the keys the reminder engine persists
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn PreferenceStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    /// Tracking flag; missing or unreadable means off
    pub fn tracking_enabled(&self) -> bool {
        match self.store.get(TRACKING_KEY) {
            Ok(Some(value)) => value.as_bool().unwrap_or(false),
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Failed to read tracking preference");
                false
            }
        }
    }

    pub fn set_tracking_enabled(&self, enabled: bool) -> Result<()> {
        debug!(enabled, "Preferences::set_tracking_enabled: called");
        self.store.set(TRACKING_KEY, Value::Bool(enabled))
    }

    /// Saved home center, if any
    pub fn home(&self) -> Option<Coordinate> {
        match self.store.get(HOME_KEY) {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(coordinate) => Some(coordinate),
                Err(e) => {
                    warn!(error = %e, "Ignoring malformed home preference");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read home preference");
                None
            }
        }
    }

    pub fn set_home(&self, coordinate: Coordinate) -> Result<()> {
        debug!(%coordinate, "Preferences::set_home: called");
        self.store.set(HOME_KEY, serde_json::to_value(coordinate)?)
    }

    pub fn clear_home(&self) -> Result<()> {
        debug!("Preferences::clear_home: called");
        self.store.remove(HOME_KEY)
    }
}
