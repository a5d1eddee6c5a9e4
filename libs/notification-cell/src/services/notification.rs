use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{NewNotification, Notification, NotificationError};

pub struct NotificationService {
    supabase: SupabaseClient,
}

impl NotificationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Insert a notification row. Recipients are usually not the caller,
    /// so the service role key is used when available.
    pub async fn notify(
        &self,
        notification: NewNotification,
        auth_token: &str,
    ) -> Result<Notification, NotificationError> {
        debug!(
            "Notifying {} ({:?}): {}",
            notification.recipient_id, notification.notification_type, notification.title
        );

        let row = json!({
            "recipient_id": notification.recipient_id,
            "notification_type": notification.notification_type,
            "title": notification.title,
            "message": notification.message,
            "is_read": false,
            "related_object_id": notification.related_object_id,
            "related_content_type": notification.related_content_type,
            "action_url": notification.action_url,
            "is_deleted": false,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let token = self.supabase.privileged_token(Some(auth_token));
        Ok(self.supabase.insert("notifications", row, token).await?)
    }

    /// Post-write hook: the triggering write has already happened, so a
    /// failed notification is logged rather than surfaced.
    pub async fn notify_all(&self, notifications: Vec<NewNotification>, auth_token: &str) {
        for notification in notifications {
            let recipient = notification.recipient_id;
            if let Err(e) = self.notify(notification, auth_token).await {
                warn!("Failed to notify {}: {}", recipient, e);
            }
        }
    }

    /// Non-deleted notifications, unread first, then newest.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Notification>, NotificationError> {
        let path = format!(
            "/rest/v1/notifications?recipient_id=eq.{}&is_deleted=eq.false&order=is_read.asc,created_at.desc",
            user_id
        );
        Ok(self.supabase.select(&path, Some(auth_token)).await?)
    }

    pub async fn latest_for_user(
        &self,
        user_id: Uuid,
        limit: usize,
        auth_token: &str,
    ) -> Result<Vec<Notification>, NotificationError> {
        let path = format!(
            "/rest/v1/notifications?recipient_id=eq.{}&is_deleted=eq.false&order=created_at.desc&limit={}",
            user_id, limit
        );
        Ok(self.supabase.select(&path, Some(auth_token)).await?)
    }

    pub async fn unread_count(&self, user_id: Uuid, auth_token: &str) -> Result<usize, NotificationError> {
        let path = format!(
            "/rest/v1/notifications?recipient_id=eq.{}&is_deleted=eq.false&is_read=eq.false&select=id",
            user_id
        );
        Ok(self.supabase.count(&path, Some(auth_token)).await?)
    }

    /// Mark one notification read. The nil id stands for "all of mine".
    pub async fn mark_read(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
        auth_token: &str,
    ) -> Result<usize, NotificationError> {
        if notification_id.is_nil() {
            return self.mark_all_read(user_id, auth_token).await;
        }

        let path = format!(
            "/rest/v1/notifications?id=eq.{}&recipient_id=eq.{}&is_deleted=eq.false",
            notification_id, user_id
        );
        let updated: Vec<Value> = self
            .supabase
            .update(&path, json!({ "is_read": true, "updated_at": Utc::now().to_rfc3339() }), Some(auth_token))
            .await?;

        if updated.is_empty() {
            return Err(NotificationError::NotFound);
        }
        Ok(updated.len())
    }

    pub async fn mark_all_read(&self, user_id: Uuid, auth_token: &str) -> Result<usize, NotificationError> {
        debug!("Marking all notifications read for {}", user_id);

        let path = format!(
            "/rest/v1/notifications?recipient_id=eq.{}&is_read=eq.false&is_deleted=eq.false",
            user_id
        );
        let updated: Vec<Value> = self
            .supabase
            .update(&path, json!({ "is_read": true, "updated_at": Utc::now().to_rfc3339() }), Some(auth_token))
            .await?;
        Ok(updated.len())
    }

    /// Soft delete: the row stays but disappears from every listing.
    pub async fn delete(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
        auth_token: &str,
    ) -> Result<(), NotificationError> {
        let now = Utc::now().to_rfc3339();
        let path = format!(
            "/rest/v1/notifications?id=eq.{}&recipient_id=eq.{}&is_deleted=eq.false",
            notification_id, user_id
        );
        let updated: Vec<Value> = self
            .supabase
            .update(
                &path,
                json!({ "is_deleted": true, "deleted_at": now, "updated_at": now }),
                Some(auth_token),
            )
            .await?;

        if updated.is_empty() {
            return Err(NotificationError::NotFound);
        }
        Ok(())
    }
}
