use crate::models::DbNotification;
use chrono::Utc;
use eyre::Result;
use medportal_core::models::notification::NewNotification;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn create_notification(
    pool: &Pool<Postgres>,
    notification: &NewNotification,
) -> Result<DbNotification> {
    let created = sqlx::query_as::<_, DbNotification>(
        r#"
        INSERT INTO notifications (id, user_id, title, message, link, is_read, created_at)
        VALUES ($1, $2, $3, $4, $5, FALSE, $6)
        RETURNING id, user_id, title, message, link, is_read, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(notification.recipient_id)
    .bind(&notification.title)
    .bind(&notification.message)
    .bind(notification.link.as_deref())
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(created)
}

pub async fn list_notifications_for_user(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<DbNotification>> {
    let notifications = sqlx::query_as::<_, DbNotification>(
        r#"
        SELECT id, user_id, title, message, link, is_read, created_at
        FROM notifications
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(notifications)
}

/// Marks one of the user's notifications as read. Returns `false` when the
/// notification does not exist or belongs to someone else.
pub async fn mark_notification_read(
    pool: &Pool<Postgres>,
    id: Uuid,
    user_id: Uuid,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE notifications
        SET is_read = TRUE
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
