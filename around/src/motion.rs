//! Motion activity monitor
//!
//! Collapses classifier output to walking / not walking and debounces it:
//! only a classification that differs from the previous one produces a
//! transition.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::coordinator::ReminderRequest;
use crate::domain::MotionState;
use crate::error::{ReminderError, ReminderResult};
use crate::sources::{EventSink, MotionSource, MotionUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MotionTransition {
    StartedWalking,
    StoppedWalking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionOutcome {
    Stale,
    /// Same as the previous classification
    Suppressed,
    Transition(MotionTransition),
    /// Classifier missing; motion tracking is off for the rest of the session
    Unavailable,
}

pub struct MotionActivityMonitor {
    source: Arc<dyn MotionSource>,
    generation: u64,
    active: bool,
    state: MotionState,
    unavailable: bool,
}

impl MotionActivityMonitor {
    pub fn new(source: Arc<dyn MotionSource>) -> Self {
        Self {
            source,
            generation: 0,
            active: false,
            state: MotionState::Stationary,
            unavailable: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    /// True once the classifier was found missing this session
    pub fn is_unavailable(&self) -> bool {
        self.unavailable
    }

    /// Start the classification stream
    ///
    /// Returns `Ok(false)` if it was already running. An unavailable
    /// classifier is never retried within the session.
    pub fn start(&mut self, tx: &mpsc::Sender<ReminderRequest>) -> ReminderResult<bool> {
        debug!(active = self.active, unavailable = self.unavailable, "MotionActivityMonitor::start: called");
        if self.active {
            return Ok(false);
        }
        if self.unavailable {
            return Err(ReminderError::SourceUnavailable("motion activity".to_string()));
        }
        if !self.source.is_available() {
            error!("Activity tracking not available");
            self.unavailable = true;
            return Err(ReminderError::SourceUnavailable("motion activity".to_string()));
        }

        self.generation += 1;
        let sink = EventSink::new(tx.clone(), self.generation, |generation, update| {
            ReminderRequest::Motion { generation, update }
        });
        if let Err(e) = self.source.start(sink) {
            error!(error = %e, "Failed to start motion updates");
            self.unavailable = true;
            return Err(e);
        }
        self.active = true;
        self.state = MotionState::Stationary;
        info!(generation = self.generation, "Started motion tracking");
        Ok(true)
    }

    /// Stop the classification stream; idempotent
    pub fn stop(&mut self) -> bool {
        let was_active = self.active;
        if was_active {
            info!("Stopping motion tracking");
            self.source.stop();
            self.active = false;
        }
        self.generation += 1;
        self.state = MotionState::Stationary;
        was_active
    }

    /// Clear the per-session unavailability flag
    pub fn reset_session(&mut self) {
        debug!("MotionActivityMonitor::reset_session: called");
        self.unavailable = false;
    }

    pub fn on_update(&mut self, generation: u64, update: MotionUpdate) -> MotionOutcome {
        if !self.active || generation != self.generation {
            debug!(generation, current = self.generation, "MotionActivityMonitor::on_update: stale");
            return MotionOutcome::Stale;
        }

        match update {
            MotionUpdate::Classified(kind) => {
                let next = kind.motion_state();
                if next == self.state {
                    debug!(?kind, "Duplicate classification suppressed");
                    return MotionOutcome::Suppressed;
                }
                self.state = next;
                match next {
                    MotionState::Walking => {
                        debug!("Walking activity detected");
                        MotionOutcome::Transition(MotionTransition::StartedWalking)
                    }
                    MotionState::Stationary => {
                        debug!(?kind, "Non-walking activity detected");
                        MotionOutcome::Transition(MotionTransition::StoppedWalking)
                    }
                }
            }
            MotionUpdate::Unavailable => {
                error!("Motion classifier became unavailable");
                self.source.stop();
                self.active = false;
                self.unavailable = true;
                self.generation += 1;
                self.state = MotionState::Stationary;
                MotionOutcome::Unavailable
            }
        }
    }
}
