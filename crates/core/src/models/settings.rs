use std::{collections::HashMap, ops::RangeInclusive};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{errors::PortalError, scheduling::MAX_APPOINTMENT_MINUTES};

pub const DEFAULT_APPOINTMENT_DURATION_KEY: &str = "default_appointment_duration";
pub const CANCELLATION_NOTICE_KEY: &str = "cancellation_notice";

pub const DEFAULT_APPOINTMENT_DURATION_MINUTES: i64 = 30;
pub const DEFAULT_CANCELLATION_NOTICE_HOURS: i64 = 24;

/// Longest notice period an admin can require: one year.
pub const MAX_CANCELLATION_NOTICE_HOURS: i64 = 24 * 365;

/// Accepted values for a numeric setting, or `None` for free-form keys.
fn numeric_range(key: &str) -> Option<RangeInclusive<i64>> {
    match key {
        DEFAULT_APPOINTMENT_DURATION_KEY => Some(1..=MAX_APPOINTMENT_MINUTES),
        CANCELLATION_NOTICE_KEY => Some(0..=MAX_CANCELLATION_NOTICE_HOURS),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSetting {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub settings: Vec<SystemSetting>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSettingRequest {
    pub csrf_token: String,
    pub value: String,
}

/// The subset of `system_settings` the scheduling rules read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingSettings {
    pub default_duration_minutes: i64,
    pub cancellation_notice_hours: i64,
}

impl Default for SchedulingSettings {
    fn default() -> Self {
        Self {
            default_duration_minutes: DEFAULT_APPOINTMENT_DURATION_MINUTES,
            cancellation_notice_hours: DEFAULT_CANCELLATION_NOTICE_HOURS,
        }
    }
}

impl SchedulingSettings {
    /// Builds settings from raw key/value rows. Missing, unparsable or
    /// out-of-range values fall back to the defaults.
    pub fn from_pairs(pairs: &HashMap<String, String>) -> Self {
        let defaults = Self::default();
        let read = |key: &str, fallback: i64| {
            pairs
                .get(key)
                .and_then(|v| v.trim().parse::<i64>().ok())
                .filter(|v| numeric_range(key).is_some_and(|range| range.contains(v)))
                .unwrap_or(fallback)
        };

        Self {
            default_duration_minutes: read(
                DEFAULT_APPOINTMENT_DURATION_KEY,
                defaults.default_duration_minutes,
            ),
            cancellation_notice_hours: read(
                CANCELLATION_NOTICE_KEY,
                defaults.cancellation_notice_hours,
            ),
        }
    }
}

/// Rejects values for known keys that the scheduling rules could not use.
pub fn validate_setting(key: &str, value: &str) -> Result<(), PortalError> {
    if let Some(range) = numeric_range(key) {
        let parsed = value.trim().parse::<i64>().map_err(|_| {
            PortalError::Validation(format!("Setting {} must be a whole number", key))
        })?;
        if !range.contains(&parsed) {
            return Err(PortalError::Validation(format!(
                "Setting {} must be between {} and {}",
                key,
                range.start(),
                range.end()
            )));
        }
        return Ok(());
    }

    if key.trim().is_empty() {
        return Err(PortalError::Validation("Setting key must not be empty".to_string()));
    }
    Ok(())
}
