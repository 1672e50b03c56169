use std::collections::HashMap;

use crate::models::DbSystemSetting;
use chrono::Utc;
use eyre::Result;
use medportal_core::models::settings::SchedulingSettings;
use sqlx::{Pool, Postgres};

pub async fn get_all_settings(pool: &Pool<Postgres>) -> Result<Vec<DbSystemSetting>> {
    let settings = sqlx::query_as::<_, DbSystemSetting>(
        r#"
        SELECT key, value, updated_at
        FROM system_settings
        ORDER BY key ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(settings)
}

pub async fn upsert_setting(pool: &Pool<Postgres>, key: &str, value: &str) -> Result<DbSystemSetting> {
    let setting = sqlx::query_as::<_, DbSystemSetting>(
        r#"
        INSERT INTO system_settings (key, value, updated_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (key)
        DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at
        RETURNING key, value, updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    tracing::info!("System setting updated: {}={}", setting.key, setting.value);
    Ok(setting)
}

/// Reads the scheduling-related settings, falling back to defaults for
/// missing or malformed values.
pub async fn load_scheduling_settings(pool: &Pool<Postgres>) -> Result<SchedulingSettings> {
    let pairs: HashMap<String, String> = get_all_settings(pool)
        .await?
        .into_iter()
        .map(|s| (s.key, s.value))
        .collect();

    Ok(SchedulingSettings::from_pairs(&pairs))
}
