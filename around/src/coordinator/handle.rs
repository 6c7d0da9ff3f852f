//! ReminderHandle - client interface for the presentation layer

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use super::messages::{ReminderEvent, ReminderRequest, ReminderSnapshot};
use crate::domain::{AuthorizationStatus, Coordinate, HomeGeofence};
use crate::error::{ReminderError, ReminderResult};

/// Handle for issuing user intents to the coordinator
///
/// Cloneable; every call is a request on the coordinator's queue, so calls
/// from one handle are applied in the order they were made.
#[derive(Clone)]
pub struct ReminderHandle {
    tx: mpsc::Sender<ReminderRequest>,
    event_tx: broadcast::Sender<ReminderEvent>,
}

impl ReminderHandle {
    pub(crate) fn new(tx: mpsc::Sender<ReminderRequest>, event_tx: broadcast::Sender<ReminderEvent>) -> Self {
        debug!("ReminderHandle::new: called");
        Self { tx, event_tx }
    }

    /// Subscribe to authorization updates, prompting once if undetermined
    pub async fn request_authorization(&self) -> ReminderResult<AuthorizationStatus> {
        debug!("ReminderHandle::request_authorization: called");
        let (reply, rx) = oneshot::channel();
        self.request(ReminderRequest::RequestAuthorization { reply }).await?;
        rx.await.map_err(|_| ReminderError::ChannelError)
    }

    /// Set or replace the home center; the radius comes from configuration
    pub async fn set_home_location(&self, coordinate: Coordinate) -> ReminderResult<HomeGeofence> {
        debug!(%coordinate, "ReminderHandle::set_home_location: called");
        let (reply, rx) = oneshot::channel();
        self.request(ReminderRequest::SetHomeLocation { coordinate, reply }).await?;
        rx.await.map_err(|_| ReminderError::ChannelError)?
    }

    pub async fn clear_home_location(&self) -> ReminderResult<()> {
        debug!("ReminderHandle::clear_home_location: called");
        let (reply, rx) = oneshot::channel();
        self.request(ReminderRequest::ClearHomeLocation { reply }).await?;
        rx.await.map_err(|_| ReminderError::ChannelError)?
    }

    /// Turn tracking on or off
    ///
    /// Enabling fails with `PermissionDenied` unless background location
    /// permission has been granted.
    pub async fn set_tracking_enabled(&self, enabled: bool) -> ReminderResult<()> {
        debug!(enabled, "ReminderHandle::set_tracking_enabled: called");
        let (reply, rx) = oneshot::channel();
        self.request(ReminderRequest::SetTrackingEnabled { enabled, reply }).await?;
        rx.await.map_err(|_| ReminderError::ChannelError)?
    }

    pub async fn snapshot(&self) -> ReminderResult<ReminderSnapshot> {
        debug!("ReminderHandle::snapshot: called");
        let (reply, rx) = oneshot::channel();
        self.request(ReminderRequest::GetSnapshot { reply }).await?;
        rx.await.map_err(|_| ReminderError::ChannelError)
    }

    /// Feed of everything the coordinator does from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ReminderEvent> {
        debug!("ReminderHandle::subscribe: called");
        self.event_tx.subscribe()
    }

    /// Stop all tracking and end the coordinator task
    pub async fn shutdown(&self) -> ReminderResult<()> {
        debug!("ReminderHandle::shutdown: called");
        self.request(ReminderRequest::Shutdown).await
    }

    async fn request(&self, req: ReminderRequest) -> ReminderResult<()> {
        self.tx.send(req).await.map_err(|_| ReminderError::ChannelError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closed_coordinator_is_channel_error() {
        let (tx, rx) = mpsc::channel(1);
        let (event_tx, _) = broadcast::channel(1);
        let handle = ReminderHandle::new(tx, event_tx);
        drop(rx);

        assert!(matches!(handle.snapshot().await, Err(ReminderError::ChannelError)));
        assert!(matches!(handle.shutdown().await, Err(ReminderError::ChannelError)));
    }

    #[tokio::test]
    async fn test_dropped_reply_is_channel_error() {
        let (tx, mut rx) = mpsc::channel(1);
        let (event_tx, _) = broadcast::channel(1);
        let handle = ReminderHandle::new(tx, event_tx);

        let responder = tokio::spawn(async move {
            // Receive and drop the reply sender without answering
            let _ = rx.recv().await;
        });

        assert!(matches!(
            handle.set_tracking_enabled(true).await,
            Err(ReminderError::ChannelError)
        ));
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_subscribe_receives_broadcast() {
        let (tx, _rx) = mpsc::channel(1);
        let (event_tx, _) = broadcast::channel(4);
        let handle = ReminderHandle::new(tx, event_tx.clone());

        let mut events = handle.subscribe();
        event_tx.send(ReminderEvent::ScreenTimerStarted).unwrap();
        assert_eq!(events.recv().await.unwrap(), ReminderEvent::ScreenTimerStarted);
    }
}
