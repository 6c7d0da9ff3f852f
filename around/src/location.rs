//! Location subscription manager
//!
//! Owns the position-fix subscription and evaluates home containment on
//! every fix. It only reports what happened; the coordinator decides what
//! to start or stop.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::coordinator::ReminderRequest;
use crate::domain::{AuthorizationStatus, Coordinate, HomeGeofence};
use crate::error::{LocationError, ReminderResult};
use crate::sources::{EventSink, LocationSource, LocationUpdate};

/// Edge-triggered containment change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeofenceTransition {
    EnteredHome,
    LeftHome,
}

/// What a single location delivery amounted to
#[derive(Debug, Clone, PartialEq)]
pub enum LocationOutcome {
    /// Delivered by a subscription that is no longer live
    Stale,
    Fix {
        coordinate: Coordinate,
        inside_home: bool,
        transition: Option<GeofenceTransition>,
    },
    /// The subscription ended; it must be restarted explicitly
    Failed(LocationError),
}

pub struct LocationSubscriptionManager {
    source: Arc<dyn LocationSource>,
    generation: u64,
    active: bool,
    last_fix: Option<Coordinate>,
    inside_home: Option<bool>,
}

impl LocationSubscriptionManager {
    pub fn new(source: Arc<dyn LocationSource>) -> Self {
        Self {
            source,
            generation: 0,
            active: false,
            last_fix: None,
            inside_home: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn last_fix(&self) -> Option<Coordinate> {
        self.last_fix
    }

    pub fn inside_home(&self) -> Option<bool> {
        self.inside_home
    }

    /// Start the fix stream if allowed
    ///
    /// Returns `Ok(false)` when already running or when the guard
    /// (background authorization and tracking enabled) does not hold.
    pub fn start(
        &mut self,
        status: AuthorizationStatus,
        tracking_enabled: bool,
        tx: &mpsc::Sender<ReminderRequest>,
    ) -> ReminderResult<bool> {
        debug!(%status, tracking_enabled, active = self.active, "LocationSubscriptionManager::start: called");
        if self.active {
            return Ok(false);
        }
        if !status.permits_tracking() || !tracking_enabled {
            debug!("LocationSubscriptionManager::start: guard not satisfied");
            return Ok(false);
        }

        self.generation += 1;
        let sink = EventSink::new(tx.clone(), self.generation, |generation, update| {
            ReminderRequest::Location { generation, update }
        });
        self.source.start(sink)?;
        self.active = true;
        info!(generation = self.generation, "Subscribed to location updates");
        Ok(true)
    }

    /// Stop the fix stream; idempotent
    pub fn stop(&mut self) -> bool {
        let was_active = self.active;
        if was_active {
            info!("Unsubscribing from location updates");
            self.source.stop();
            self.active = false;
        }
        // In-flight fixes from the old subscription must not be applied
        self.generation += 1;
        self.last_fix = None;
        self.inside_home = None;
        was_active
    }

    /// Process one delivery against the current home geofence
    pub fn on_update(&mut self, generation: u64, update: LocationUpdate, home: Option<&HomeGeofence>) -> LocationOutcome {
        if !self.active || generation != self.generation {
            debug!(generation, current = self.generation, "LocationSubscriptionManager::on_update: stale");
            return LocationOutcome::Stale;
        }

        match update {
            LocationUpdate::Fix(coordinate) => {
                debug!(%coordinate, "Location fix");
                self.last_fix = Some(coordinate);

                // No home set: never suppress
                let inside = home.is_some_and(|home| home.contains(&coordinate));
                let transition = match (self.inside_home, inside) {
                    (Some(true), true) => None,
                    (_, true) => Some(GeofenceTransition::EnteredHome),
                    (Some(true), false) => Some(GeofenceTransition::LeftHome),
                    (_, false) => None,
                };
                self.inside_home = Some(inside);

                LocationOutcome::Fix {
                    coordinate,
                    inside_home: inside,
                    transition,
                }
            }
            LocationUpdate::Failed(err) => {
                warn!(error = %err, "Location subscription ended with failure");
                self.active = false;
                self.generation += 1;
                self.inside_home = None;
                LocationOutcome::Failed(err)
            }
        }
    }
}
