//! Authorization tracker
//!
//! Folds permission-change events into a single current status. Only one
//! subscription is live at a time; observing again replaces the previous one
//! and any event still queued from it is ignored.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::coordinator::ReminderRequest;
use crate::domain::AuthorizationStatus;
use crate::sources::{AuthorizationSource, EventSink};

pub struct AuthorizationTracker {
    source: Arc<dyn AuthorizationSource>,
    status: AuthorizationStatus,
    generation: u64,
    subscribed: bool,
    prompted: bool,
}

impl AuthorizationTracker {
    pub fn new(source: Arc<dyn AuthorizationSource>) -> Self {
        let status = source.current();
        debug!(%status, "AuthorizationTracker::new: called");
        Self {
            source,
            status,
            generation: 0,
            subscribed: false,
            prompted: false,
        }
    }

    pub fn status(&self) -> AuthorizationStatus {
        self.status
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Subscribe to status changes and return the current status
    ///
    /// The first observation while the status is still undetermined shows the
    /// system prompt, once per tracker.
    pub fn observe(&mut self, tx: &mpsc::Sender<ReminderRequest>) -> AuthorizationStatus {
        self.generation += 1;
        debug!(generation = self.generation, "AuthorizationTracker::observe: called");

        let sink = EventSink::new(tx.clone(), self.generation, |generation, status| {
            ReminderRequest::Authorization { generation, status }
        });
        self.source.subscribe(sink);
        self.subscribed = true;

        let current = self.source.current();
        if current == AuthorizationStatus::Undetermined && !self.prompted {
            info!("Requesting background location authorization");
            self.prompted = true;
            self.source.request_always_authorization();
        }
        current
    }

    /// Accept a status event from the live subscription
    ///
    /// Returns the previous status when the value actually changed.
    pub fn on_status(&mut self, generation: u64, status: AuthorizationStatus) -> Option<AuthorizationStatus> {
        if !self.subscribed || generation != self.generation {
            debug!(generation, current = self.generation, "AuthorizationTracker::on_status: stale event dropped");
            return None;
        }
        self.apply(status)
    }

    /// Record a status; returns the previous one if it changed
    pub fn apply(&mut self, status: AuthorizationStatus) -> Option<AuthorizationStatus> {
        if status == self.status {
            return None;
        }
        let previous = std::mem::replace(&mut self.status, status);
        info!(from = %previous, to = %status, "Authorization status changed");
        Some(previous)
    }
}
