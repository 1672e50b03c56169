//! # Cancellation Notice Policy
//!
//! Patients may cancel a scheduled appointment only while at least
//! `cancellation_notice` hours remain before it starts. Exactly at the
//! threshold is still allowed. Doctors and admins are not bound by the notice
//! period, but nobody can cancel an appointment that has already reached a
//! terminal status.

use chrono::{Duration, NaiveDateTime};

use crate::{
    errors::{PortalError, PortalResult},
    models::{
        appointment::{Appointment, AppointmentStatus},
        user::Role,
    },
};

/// Checks the notice period alone.
///
/// # Errors
///
/// * `PortalError::PolicyViolation` - fewer than `notice_hours` remain
/// * `PortalError::Validation` - `notice_hours` is not a representable duration
pub fn ensure_notice_period(
    starts_at: NaiveDateTime,
    notice_hours: i64,
    now: NaiveDateTime,
) -> PortalResult<()> {
    let notice = Duration::try_hours(notice_hours).ok_or_else(|| {
        PortalError::Validation(format!(
            "Cancellation notice of {} hours is out of range",
            notice_hours
        ))
    })?;

    if starts_at - now >= notice {
        Ok(())
    } else {
        Err(PortalError::PolicyViolation {
            required_notice_hours: notice_hours,
        })
    }
}

/// Decides whether `role` may cancel `appointment` at `now`.
pub fn ensure_cancellation_allowed(
    appointment: &Appointment,
    role: Role,
    notice_hours: i64,
    now: NaiveDateTime,
) -> PortalResult<()> {
    appointment
        .status
        .ensure_transition(AppointmentStatus::Cancelled)?;

    match role {
        Role::Patient => ensure_notice_period(appointment.starts_at(), notice_hours, now),
        Role::Doctor | Role::Admin => Ok(()),
    }
}
