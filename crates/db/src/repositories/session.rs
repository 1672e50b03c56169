use crate::models::DbSession;
use chrono::{DateTime, Utc};
use eyre::Result;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn create_session(
    pool: &Pool<Postgres>,
    token: &str,
    user_id: Uuid,
    csrf_token: &str,
    expires_at: DateTime<Utc>,
) -> Result<DbSession> {
    let session = sqlx::query_as::<_, DbSession>(
        r#"
        INSERT INTO sessions (token, user_id, csrf_token, expires_at, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING token, user_id, csrf_token, expires_at, created_at
        "#,
    )
    .bind(token)
    .bind(user_id)
    .bind(csrf_token)
    .bind(expires_at)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(session)
}

/// Looks up a session that has not expired as of `now`.
pub async fn get_active_session(
    pool: &Pool<Postgres>,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Option<DbSession>> {
    let session = sqlx::query_as::<_, DbSession>(
        r#"
        SELECT token, user_id, csrf_token, expires_at, created_at
        FROM sessions
        WHERE token = $1 AND expires_at > $2
        "#,
    )
    .bind(token)
    .bind(now)
    .fetch_optional(pool)
    .await?;

    Ok(session)
}

pub async fn delete_session(pool: &Pool<Postgres>, token: &str) -> Result<()> {
    sqlx::query(
        r#"
        DELETE FROM sessions
        WHERE token = $1
        "#,
    )
    .bind(token)
    .execute(pool)
    .await?;

    Ok(())
}

/// Drops every session belonging to a user, e.g. after a password change.
pub async fn delete_sessions_for_user(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    keep_token: Option<&str>,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM sessions
        WHERE user_id = $1 AND ($2::VARCHAR IS NULL OR token <> $2)
        "#,
    )
    .bind(user_id)
    .bind(keep_token)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn delete_expired_sessions(pool: &Pool<Postgres>, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM sessions
        WHERE expires_at <= $1
        "#,
    )
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
