//! Notifications repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::notification::{NewNotification, Notification},
};

#[derive(Clone)]
pub struct NotificationsRepository {
    pool: Pool<Postgres>,
}

impl NotificationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn create(&self, notification: &NewNotification) -> AppResult<Notification> {
        let created = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (recipient_id, title, message, priority, related_type, related_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(notification.recipient_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.priority)
        .bind(notification.related_type)
        .bind(notification.related_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// Notifications of one recipient, newest first
    pub async fn list(
        &self,
        recipient_id: i32,
        unread_only: bool,
        page: i64,
        per_page: i64,
    ) -> AppResult<(Vec<Notification>, i64)> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND (NOT $2 OR NOT is_read)",
        )
        .bind(recipient_id)
        .bind(unread_only)
        .fetch_one(&self.pool)
        .await?;

        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE recipient_id = $1 AND (NOT $2 OR NOT is_read)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(recipient_id)
        .bind(unread_only)
        .bind(per_page)
        .bind(super::offset(page, per_page))
        .fetch_all(&self.pool)
        .await?;

        Ok((notifications, total))
    }

    pub async fn unread_count(&self, recipient_id: i32) -> AppResult<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND NOT is_read",
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Mark one notification read or unread. Other users' notifications are reported as missing.
    pub async fn mark_read(&self, id: i32, recipient_id: i32, read: bool) -> AppResult<Notification> {
        sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications
            SET is_read = $3, read_at = CASE WHEN $3 THEN COALESCE(read_at, NOW()) ELSE NULL END
            WHERE id = $1 AND recipient_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(recipient_id)
        .bind(read)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Notification {} not found", id)))
    }

    /// Mark every unread notification of a recipient as read; returns how many changed
    pub async fn mark_all_read(&self, recipient_id: i32) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = NOW() WHERE recipient_id = $1 AND NOT is_read",
        )
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, id: i32, recipient_id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND recipient_id = $2")
            .bind(id)
            .bind(recipient_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Notification {} not found", id)));
        }
        Ok(())
    }
}
