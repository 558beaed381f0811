//! Notification model and live channel events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::enums::{NotificationPriority, RelatedEntity};

/// Persisted notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Notification {
    pub id: i32,
    pub recipient_id: i32,
    pub title: String,
    pub message: String,
    pub priority: NotificationPriority,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub related_type: Option<RelatedEntity>,
    pub related_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Notification to be created for one recipient
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: i32,
    pub title: String,
    pub message: String,
    pub priority: NotificationPriority,
    pub related_type: Option<RelatedEntity>,
    pub related_id: Option<i32>,
}

impl NewNotification {
    pub fn new(recipient_id: i32, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            recipient_id,
            title: title.into(),
            message: message.into(),
            priority: NotificationPriority::Medium,
            related_type: None,
            related_id: None,
        }
    }

    pub fn priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn related(mut self, entity: RelatedEntity, id: i32) -> Self {
        self.related_type = Some(entity);
        self.related_id = Some(id);
        self
    }
}

/// Notification list query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct NotificationQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Only return unread notifications
    pub unread_only: Option<bool>,
}

/// Mark a notification read or unread
#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkRead {
    #[serde(default = "default_read")]
    pub read: bool,
}

fn default_read() -> bool {
    true
}

/// Event pushed over the live channel, keyed by recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveEvent {
    pub user_id: i32,
    pub payload: LivePayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum LivePayload {
    NewNotification(Notification),
    UnreadCount { count: i64 },
}

impl LivePayload {
    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            LivePayload::NewNotification(_) => "new_notification",
            LivePayload::UnreadCount { .. } => "unread_count",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let n = NewNotification::new(4, "Checkout approved", "Your request #3 was approved")
            .priority(NotificationPriority::High)
            .related(RelatedEntity::Checkout, 3);
        assert_eq!(n.recipient_id, 4);
        assert_eq!(n.priority, NotificationPriority::High);
        assert_eq!(n.related_type, Some(RelatedEntity::Checkout));
        assert_eq!(n.related_id, Some(3));
    }

    #[test]
    fn test_live_event_wire_format() {
        let event = LiveEvent {
            user_id: 9,
            payload: LivePayload::UnreadCount { count: 2 },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["user_id"], 9);
        assert_eq!(json["payload"]["event"], "unread_count");
        assert_eq!(json["payload"]["data"]["count"], 2);

        let back: LiveEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.payload.name(), "unread_count");
    }

    #[test]
    fn test_mark_read_defaults_to_true() {
        let body: MarkRead = serde_json::from_str("{}").unwrap();
        assert!(body.read);
    }
}
