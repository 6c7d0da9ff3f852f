//! Notification sinks for simulation and tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use colored::Colorize;
use tracing::info;

use crate::error::{ReminderError, ReminderResult};
use crate::sources::{NotificationSink, ReminderNotification};

/// Keeps every delivered notification in memory
#[derive(Debug, Default)]
pub struct RecordingNotificationSink {
    sent: Mutex<Vec<ReminderNotification>>,
    failing: AtomicBool,
    permission_requests: AtomicUsize,
}

impl RecordingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every delivery from now on, as a denied permission would
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<ReminderNotification> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    pub fn permission_requests(&self) -> usize {
        self.permission_requests.load(Ordering::SeqCst)
    }

    /// Number of successful deliveries
    pub fn count(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or(0)
    }
}

#[async_trait]
impl NotificationSink for RecordingNotificationSink {
    async fn send(&self, notification: &ReminderNotification) -> ReminderResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ReminderError::DeliveryFailure("notifications not permitted".to_string()));
        }
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| ReminderError::DeliveryFailure("recorder poisoned".to_string()))?;
        sent.push(notification.clone());
        Ok(())
    }

    async fn request_permission(&self) -> ReminderResult<()> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ReminderError::DeliveryFailure("notification permission denied".to_string()));
        }
        Ok(())
    }
}

/// Prints reminders to the terminal
#[derive(Debug, Default)]
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn send(&self, notification: &ReminderNotification) -> ReminderResult<()> {
        info!(id = %notification.id, title = %notification.title, "Reminder delivered");
        println!(
            "{} {} {}",
            notification.created_at.format("%H:%M:%S").to_string().dimmed(),
            notification.title.bold().yellow(),
            notification.body
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_sink_records() {
        let sink = RecordingNotificationSink::new();
        let notification = ReminderNotification::new("Look Around", "Reminder to look around");
        sink.send(&notification).await.unwrap();

        assert_eq!(sink.count(), 1);
        assert_eq!(sink.sent()[0].id, notification.id);
    }

    #[tokio::test]
    async fn test_failing_sink_reports_delivery_failure() {
        let sink = RecordingNotificationSink::new();
        sink.set_failing(true);
        let notification = ReminderNotification::new("t", "b");

        let result = sink.send(&notification).await;
        assert!(matches!(result, Err(ReminderError::DeliveryFailure(_))));
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test]
    async fn test_permission_requests_are_counted() {
        let sink = RecordingNotificationSink::new();
        sink.request_permission().await.unwrap();
        assert_eq!(sink.permission_requests(), 1);

        sink.set_failing(true);
        assert!(sink.request_permission().await.is_err());
        assert_eq!(sink.permission_requests(), 2);
    }

    #[tokio::test]
    async fn test_default_permission_request_succeeds() {
        assert!(LogNotificationSink.request_permission().await.is_ok());
    }
}
