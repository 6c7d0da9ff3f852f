//! EventSink - generation-tagged delivery handle into the coordinator queue

use std::fmt;

use tokio::sync::mpsc;
use tracing::debug;

use crate::coordinator::ReminderRequest;
use crate::error::{ReminderError, ReminderResult};

/// Handle a provider uses to push events onto the coordinator's queue
///
/// Every event is stamped with the generation of the subscription that
/// produced it. Cheap to clone.
pub struct EventSink<T> {
    tx: mpsc::Sender<ReminderRequest>,
    generation: u64,
    wrap: fn(u64, T) -> ReminderRequest,
}

impl<T> EventSink<T> {
    pub(crate) fn new(tx: mpsc::Sender<ReminderRequest>, generation: u64, wrap: fn(u64, T) -> ReminderRequest) -> Self {
        debug!(generation, "EventSink::new: called");
        Self { tx, generation, wrap }
    }

    /// Generation of the subscription this sink belongs to
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Enqueue an event, waiting for queue capacity
    pub async fn send(&self, event: T) -> ReminderResult<()> {
        self.tx
            .send((self.wrap)(self.generation, event))
            .await
            .map_err(|_| ReminderError::ChannelError)
    }

    /// Enqueue an event from a synchronous callback context
    pub fn try_send(&self, event: T) -> ReminderResult<()> {
        self.tx
            .try_send((self.wrap)(self.generation, event))
            .map_err(|_| ReminderError::ChannelError)
    }

    /// True once the coordinator has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> Clone for EventSink<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            generation: self.generation,
            wrap: self.wrap,
        }
    }
}

impl<T> fmt::Debug for EventSink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("generation", &self.generation)
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}
