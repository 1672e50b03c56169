use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::PortalError;

/// Lifecycle state of an appointment.
///
/// `Cancelled` is a soft delete: the row stays but no longer occupies a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no-show",
        }
    }

    /// Whether the appointment still holds its slot on the doctor's calendar.
    pub fn occupies_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AppointmentStatus::Scheduled)
    }

    /// Statuses reachable from `self` in one step.
    pub fn allowed_transitions(&self) -> &'static [AppointmentStatus] {
        match self {
            AppointmentStatus::Scheduled => &[
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            AppointmentStatus::Completed
            | AppointmentStatus::Cancelled
            | AppointmentStatus::NoShow => &[],
        }
    }

    pub fn ensure_transition(&self, next: AppointmentStatus) -> Result<(), PortalError> {
        if self.allowed_transitions().contains(&next) {
            Ok(())
        } else {
            Err(PortalError::Validation(format!(
                "Cannot change appointment status from {} to {}",
                self, next
            )))
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "no-show" => Ok(AppointmentStatus::NoShow),
            other => Err(PortalError::Validation(format!(
                "Unknown appointment status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.patient_id == user_id || self.doctor_id == user_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub csrf_token: String,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    /// Minutes; falls back to the `default_appointment_duration` setting.
    pub duration_minutes: Option<i64>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub csrf_token: String,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub csrf_token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentListQuery {
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentListResponse {
    pub appointments: Vec<Appointment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookedSlotsQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookedSlot {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookedSlotsResponse {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub slots: Vec<BookedSlot>,
}
