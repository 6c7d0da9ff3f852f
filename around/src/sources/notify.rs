//! Notification sink and the reminder payload

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ReminderResult;

/// The single side effect of the system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderNotification {
    pub id: String,
    pub title: String,
    pub body: String,
    #[serde(rename = "created-at")]
    pub created_at: DateTime<Utc>,
}

impl ReminderNotification {
    /// Build a notification with a fresh identifier
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            title: title.into(),
            body: body.into(),
            created_at: Utc::now(),
        }
    }
}

/// Delivers reminders to the user
///
/// Fire-and-forget from the coordinator's point of view: failures come back
/// as `DeliveryFailure` and are only logged.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, notification: &ReminderNotification) -> ReminderResult<()>;

    /// Ask the platform for permission to post notifications
    ///
    /// Called once when the coordinator starts. A refusal only means later
    /// sends fail.
    async fn request_permission(&self) -> ReminderResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifications_get_unique_ids() {
        let a = ReminderNotification::new("Look Around", "Reminder to look around");
        let b = ReminderNotification::new("Look Around", "Reminder to look around");
        assert_ne!(a.id, b.id);
        assert_eq!(a.title, "Look Around");
        assert_eq!(a.body, "Reminder to look around");
    }
}
