use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_models::error::AppError;

pub const MAX_TITLE_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Appointment,
    Prescription,
    Payment,
    System,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub related_object_id: Option<Uuid>,
    pub related_content_type: Option<String>,
    pub action_url: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A notification about to be written for one recipient.
#[derive(Debug, Clone, Serialize)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub related_object_id: Option<Uuid>,
    pub related_content_type: Option<String>,
    pub action_url: Option<String>,
}

impl NewNotification {
    pub fn new(
        recipient_id: Uuid,
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let title: String = title.into();
        Self {
            recipient_id,
            notification_type,
            title: title.chars().take(MAX_TITLE_LEN).collect(),
            message: message.into(),
            related_object_id: None,
            related_content_type: None,
            action_url: None,
        }
    }

    pub fn related(mut self, object_id: Uuid, content_type: &str) -> Self {
        self.related_object_id = Some(object_id);
        self.related_content_type = Some(content_type.to_string());
        self
    }

    pub fn with_action_url(mut self, url: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification not found")]
    NotFound,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::NotFound => AppError::NotFound("Notification not found".to_string()),
            NotificationError::Database(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn long_titles_are_cut() {
        let n = NewNotification::new(Uuid::nil(), NotificationType::System, "x".repeat(150), "body");
        assert_eq!(n.title.chars().count(), MAX_TITLE_LEN);
    }

    #[test]
    fn builder_sets_relation() {
        let id = Uuid::new_v4();
        let n = NewNotification::new(Uuid::nil(), NotificationType::Appointment, "t", "m")
            .related(id, "appointment")
            .with_action_url("/appointments/1");
        assert_eq!(n.related_object_id, Some(id));
        assert_eq!(n.related_content_type.as_deref(), Some("appointment"));
        assert_eq!(n.action_url.as_deref(), Some("/appointments/1"));
    }

    #[test]
    fn not_found_maps_to_404() {
        let err: AppError = NotificationError::NotFound.into();
        assert_matches!(err, AppError::NotFound(_));
    }
}
