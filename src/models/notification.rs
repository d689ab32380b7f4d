use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw `notifications` row. Every text column is nullable so that rows written
/// by older producers (title-only or message-only) still load.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: i64,
    pub user_id: i64,
    pub title: Option<String>,
    pub message: Option<String>,
    pub r#type: Option<String>, // 'type' is a reserved keyword
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Delivery status reported by the API. Only successfully stored
/// notifications exist, so there is a single state.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    #[default]
    Sent,
}

/// API representation of a notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub r#type: Option<String>,
    pub title: String,
    pub message: String,
    pub status: NotificationStatus,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        let (title, message) = coalesce_text(row.title, row.message);
        Self {
            id: row.id,
            user_id: row.user_id,
            r#type: row.r#type,
            title,
            message,
            status: NotificationStatus::Sent,
            read: row.read,
            created_at: row.created_at,
        }
    }
}

/// Fill a blank title from the message and a blank message from the title.
/// `None` and `""` are both treated as blank.
pub fn coalesce_text(title: Option<String>, message: Option<String>) -> (String, String) {
    let title = title.unwrap_or_default();
    let message = message.unwrap_or_default();
    match (title.is_empty(), message.is_empty()) {
        (true, false) => (message.clone(), message),
        (false, true) => (title.clone(), title),
        _ => (title, message),
    }
}

/// Fields supplied by the caller when creating a notification. Storage
/// assigns `id`, `created_at` and the initial unread state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewNotification {
    pub r#type: Option<String>,
    pub title: Option<String>,
    pub message: Option<String>,
}

impl NewNotification {
    pub fn email(subject: &str) -> Self {
        Self {
            r#type: Some("email".into()),
            title: Some(subject.to_string()),
            message: Some(subject.to_string()),
        }
    }

    pub fn sms(body: &str) -> Self {
        Self {
            r#type: Some("sms".into()),
            title: Some("SMS".into()),
            message: Some(body.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendEmailRequest {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendSmsRequest {
    pub to: String,
    pub message: String,
}
