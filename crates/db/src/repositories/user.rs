use crate::models::DbUser;
use chrono::Utc;
use eyre::Result;
use medportal_core::models::user::Role;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone: Option<&'a str>,
    pub role: Role,
}

/// Inserts a user. Returns `None` when the email is already registered.
pub async fn create_user(pool: &Pool<Postgres>, user: &NewUser<'_>) -> Result<Option<DbUser>> {
    let created = sqlx::query_as::<_, DbUser>(
        r#"
        INSERT INTO users (id, email, password_hash, first_name, last_name, phone, role, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (email) DO NOTHING
        RETURNING id, email, password_hash, first_name, last_name, phone, role, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.email)
    .bind(user.password_hash)
    .bind(user.first_name)
    .bind(user.last_name)
    .bind(user.phone)
    .bind(user.role.as_str())
    .bind(Utc::now())
    .fetch_optional(pool)
    .await?;

    if let Some(u) = &created {
        tracing::debug!("User created: id={}, role={}", u.id, u.role);
    }

    Ok(created)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(
        r#"
        SELECT id, email, password_hash, first_name, last_name, phone, role, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn get_user_by_email(pool: &Pool<Postgres>, email: &str) -> Result<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(
        r#"
        SELECT id, email, password_hash, first_name, last_name, phone, role, created_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Updates the given profile fields, leaving `None` fields unchanged.
pub async fn update_profile(
    pool: &Pool<Postgres>,
    id: Uuid,
    first_name: Option<&str>,
    last_name: Option<&str>,
    phone: Option<&str>,
) -> Result<DbUser> {
    let user = sqlx::query_as::<_, DbUser>(
        r#"
        UPDATE users
        SET first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            phone = COALESCE($4, phone)
        WHERE id = $1
        RETURNING id, email, password_hash, first_name, last_name, phone, role, created_at
        "#,
    )
    .bind(id)
    .bind(first_name)
    .bind(last_name)
    .bind(phone)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

pub async fn update_password_hash(
    pool: &Pool<Postgres>,
    id: Uuid,
    password_hash: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET password_hash = $2
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(password_hash)
    .execute(pool)
    .await?;

    Ok(())
}
