//! # Slot Scheduling Rules
//!
//! A slot is a doctor's `[start, end)` interval on one calendar day. Two
//! slots overlap iff `a.start < b.end && a.end > b.start`, so back-to-back
//! appointments (one ending at 09:30, the next starting at 09:30) never
//! conflict.
//!
//! Only appointments whose status still occupies the calendar are
//! considered; cancelled appointments free their slot.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{
    errors::{PortalError, PortalResult},
    models::appointment::Appointment,
};

/// Longest appointment that can be booked in one go, in minutes.
pub const MAX_APPOINTMENT_MINUTES: i64 = 8 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Slot {
    pub fn new(start: NaiveTime, end: NaiveTime) -> PortalResult<Self> {
        if end <= start {
            return Err(PortalError::Validation(
                "Appointment end time must be after its start time".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    /// Builds the slot `[start, start + duration)`.
    ///
    /// # Errors
    ///
    /// * `PortalError::Validation` - the duration is outside
    ///   `1..=MAX_APPOINTMENT_MINUTES` or the slot would run past midnight
    pub fn from_start(start: NaiveTime, duration_minutes: i64) -> PortalResult<Self> {
        if !(1..=MAX_APPOINTMENT_MINUTES).contains(&duration_minutes) {
            return Err(PortalError::Validation(format!(
                "Appointment duration must be between 1 and {} minutes",
                MAX_APPOINTMENT_MINUTES
            )));
        }

        let (end, wrapped_secs) = start.overflowing_add_signed(Duration::minutes(duration_minutes));
        if wrapped_secs != 0 {
            return Err(PortalError::Validation(
                "Appointment must end on the same day it starts".to_string(),
            ));
        }

        Self::new(start, end)
    }

    pub fn of(appointment: &Appointment) -> Self {
        Self {
            start: appointment.start_time,
            end: appointment.end_time,
        }
    }

    pub fn overlaps(&self, other: &Slot) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Returns the first existing appointment on `date` that still occupies its
/// slot and overlaps `candidate`.
pub fn find_conflict<'a, I>(date: NaiveDate, candidate: &Slot, existing: I) -> Option<&'a Appointment>
where
    I: IntoIterator<Item = &'a Appointment>,
{
    existing.into_iter().find(|appointment| {
        appointment.date == date
            && appointment.status.occupies_slot()
            && Slot::of(appointment).overlaps(candidate)
    })
}

/// Fails with `PortalError::Conflict` when `candidate` overlaps any
/// non-cancelled appointment in `existing` on the same date.
///
/// `existing` is expected to be the doctor's appointments; callers filter by
/// doctor before calling.
pub fn ensure_slot_available<'a, I>(date: NaiveDate, candidate: &Slot, existing: I) -> PortalResult<()>
where
    I: IntoIterator<Item = &'a Appointment>,
{
    match find_conflict(date, candidate, existing) {
        Some(taken) => Err(PortalError::Conflict(format!(
            "The doctor already has an appointment from {} to {} on {}",
            taken.start_time.format("%H:%M"),
            taken.end_time.format("%H:%M"),
            date
        ))),
        None => Ok(()),
    }
}

/// Rejects bookings whose start is not strictly after `now`.
pub fn ensure_in_future(date: NaiveDate, start: NaiveTime, now: NaiveDateTime) -> PortalResult<()> {
    if date.and_time(start) <= now {
        return Err(PortalError::Validation(
            "Appointments must be booked in the future".to_string(),
        ));
    }
    Ok(())
}
