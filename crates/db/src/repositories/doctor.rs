use crate::models::{DbDoctor, DbUser};
use chrono::Utc;
use eyre::Result;
use medportal_core::models::user::Role;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::user::NewUser;

pub struct NewDoctorProfile<'a> {
    pub specialization: &'a str,
    pub license_number: &'a str,
    pub bio: Option<&'a str>,
}

/// Creates a doctor account and its profile together. Returns `None` when
/// the email is already registered.
pub async fn create_doctor(
    pool: &Pool<Postgres>,
    user: &NewUser<'_>,
    profile: &NewDoctorProfile<'_>,
) -> Result<Option<DbDoctor>> {
    let mut tx = pool.begin().await?;

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
    .bind(Role::Doctor.as_str())
    .bind(Utc::now())
    .fetch_optional(&mut *tx)
    .await?;

    let Some(created) = created else {
        return Ok(None);
    };

    sqlx::query(
        r#"
        INSERT INTO doctors (user_id, specialization, license_number, bio)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(created.id)
    .bind(profile.specialization)
    .bind(profile.license_number)
    .bind(profile.bio)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Some(DbDoctor {
        user_id: created.id,
        first_name: created.first_name,
        last_name: created.last_name,
        email: created.email,
        specialization: profile.specialization.to_string(),
        license_number: profile.license_number.to_string(),
        bio: profile.bio.map(str::to_string),
    }))
}

pub async fn list_doctors(pool: &Pool<Postgres>) -> Result<Vec<DbDoctor>> {
    let doctors = sqlx::query_as::<_, DbDoctor>(
        r#"
        SELECT d.user_id, u.first_name, u.last_name, u.email, d.specialization, d.license_number, d.bio
        FROM doctors d
        JOIN users u ON u.id = d.user_id
        ORDER BY u.last_name ASC, u.first_name ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(doctors)
}

pub async fn get_doctor_by_id(pool: &Pool<Postgres>, user_id: Uuid) -> Result<Option<DbDoctor>> {
    let doctor = sqlx::query_as::<_, DbDoctor>(
        r#"
        SELECT d.user_id, u.first_name, u.last_name, u.email, d.specialization, d.license_number, d.bio
        FROM doctors d
        JOIN users u ON u.id = d.user_id
        WHERE d.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(doctor)
}
