use crate::models::{convert_all, DbAppointment};
use chrono::{NaiveDate, Utc};
use eyre::Result;
use medportal_core::{
    errors::{PortalError, PortalResult},
    models::appointment::{Appointment, AppointmentStatus},
    scheduling::{ensure_slot_available, Slot},
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

const APPOINTMENT_COLUMNS: &str = "id, patient_id, doctor_id, appointment_date, start_time, end_time, \
     status, reason, notes, created_at, updated_at";

/// Maps driver errors into the domain error, turning a hit on the live-slot
/// unique index into a conflict.
fn map_booking_error(err: sqlx::Error) -> PortalError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return PortalError::Conflict(
                "The doctor already has an appointment at that time".to_string(),
            );
        }
    }
    PortalError::Database(err.into())
}

/// Books `slot` on `date` with `doctor_id` for `patient_id`.
///
/// The doctor's row is locked for the duration of the transaction, so two
/// concurrent bookings for the same doctor run the overlap check one after
/// the other and the second sees the first's insert.
///
/// # Errors
///
/// * `PortalError::NotFound` - no doctor profile exists for `doctor_id`
/// * `PortalError::Conflict` - the slot overlaps a non-cancelled appointment
/// * `PortalError::Database` - any other database failure
pub async fn book_appointment(
    pool: &Pool<Postgres>,
    patient_id: Uuid,
    doctor_id: Uuid,
    date: NaiveDate,
    slot: Slot,
    reason: Option<&str>,
) -> PortalResult<DbAppointment> {
    let mut tx = pool.begin().await.map_err(|e| PortalError::Database(e.into()))?;

    let doctor = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT user_id
        FROM doctors
        WHERE user_id = $1
        FOR UPDATE
        "#,
    )
    .bind(doctor_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| PortalError::Database(e.into()))?;

    if doctor.is_none() {
        return Err(PortalError::NotFound(format!("Doctor with ID {} not found", doctor_id)));
    }

    let existing = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        SELECT {APPOINTMENT_COLUMNS}
        FROM appointments
        WHERE doctor_id = $1 AND appointment_date = $2 AND status <> 'cancelled'
        ORDER BY start_time ASC
        "#
    ))
    .bind(doctor_id)
    .bind(date)
    .fetch_all(&mut *tx)
    .await
    .map_err(|e| PortalError::Database(e.into()))?;

    let existing: Vec<Appointment> = convert_all(existing)?;
    ensure_slot_available(date, &slot, &existing)?;

    let now = Utc::now();
    let appointment = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        INSERT INTO appointments
            (id, patient_id, doctor_id, appointment_date, start_time, end_time, status, reason, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(patient_id)
    .bind(doctor_id)
    .bind(date)
    .bind(slot.start)
    .bind(slot.end)
    .bind(AppointmentStatus::Scheduled.as_str())
    .bind(reason)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(map_booking_error)?;

    tx.commit().await.map_err(map_booking_error)?;

    tracing::debug!(
        "Booked appointment {} for doctor {} on {} {}-{}",
        appointment.id, doctor_id, date, slot.start, slot.end
    );
    Ok(appointment)
}

pub async fn get_appointment_by_id(
    pool: &Pool<Postgres>,
    id: Uuid,
) -> Result<Option<DbAppointment>> {
    let appointment = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        SELECT {APPOINTMENT_COLUMNS}
        FROM appointments
        WHERE id = $1
        "#
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(appointment)
}

pub async fn list_appointments_for_patient(
    pool: &Pool<Postgres>,
    patient_id: Uuid,
    status: Option<AppointmentStatus>,
) -> Result<Vec<DbAppointment>> {
    let appointments = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        SELECT {APPOINTMENT_COLUMNS}
        FROM appointments
        WHERE patient_id = $1 AND ($2::VARCHAR IS NULL OR status = $2)
        ORDER BY appointment_date DESC, start_time DESC
        "#
    ))
    .bind(patient_id)
    .bind(status.map(|s| s.as_str()))
    .fetch_all(pool)
    .await?;

    Ok(appointments)
}

pub async fn list_appointments_for_doctor(
    pool: &Pool<Postgres>,
    doctor_id: Uuid,
    status: Option<AppointmentStatus>,
) -> Result<Vec<DbAppointment>> {
    let appointments = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        SELECT {APPOINTMENT_COLUMNS}
        FROM appointments
        WHERE doctor_id = $1 AND ($2::VARCHAR IS NULL OR status = $2)
        ORDER BY appointment_date DESC, start_time DESC
        "#
    ))
    .bind(doctor_id)
    .bind(status.map(|s| s.as_str()))
    .fetch_all(pool)
    .await?;

    Ok(appointments)
}

pub async fn list_all_appointments(
    pool: &Pool<Postgres>,
    status: Option<AppointmentStatus>,
) -> Result<Vec<DbAppointment>> {
    let appointments = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        SELECT {APPOINTMENT_COLUMNS}
        FROM appointments
        WHERE ($1::VARCHAR IS NULL OR status = $1)
        ORDER BY appointment_date DESC, start_time DESC
        "#
    ))
    .bind(status.map(|s| s.as_str()))
    .fetch_all(pool)
    .await?;

    Ok(appointments)
}

/// Non-cancelled appointments for a doctor on one date, earliest first.
pub async fn get_doctor_appointments_on(
    pool: &Pool<Postgres>,
    doctor_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<DbAppointment>> {
    let appointments = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        SELECT {APPOINTMENT_COLUMNS}
        FROM appointments
        WHERE doctor_id = $1 AND appointment_date = $2 AND status <> 'cancelled'
        ORDER BY start_time ASC
        "#
    ))
    .bind(doctor_id)
    .bind(date)
    .fetch_all(pool)
    .await?;

    Ok(appointments)
}

/// Moves an appointment from `from` to `to`.
///
/// The update only applies while the row still has status `from`; if
/// another request changed it first, a validation error is returned instead
/// of silently overwriting.
pub async fn transition_status(
    pool: &Pool<Postgres>,
    id: Uuid,
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> PortalResult<DbAppointment> {
    from.ensure_transition(to)?;

    let updated = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        UPDATE appointments
        SET status = $3, updated_at = $4
        WHERE id = $1 AND status = $2
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(from.as_str())
    .bind(to.as_str())
    .bind(Utc::now())
    .fetch_optional(pool)
    .await
    .map_err(|e| PortalError::Database(e.into()))?;

    updated.ok_or_else(|| {
        PortalError::Validation(format!(
            "Appointment {} is no longer {}",
            id, from
        ))
    })
}

pub async fn update_notes(
    pool: &Pool<Postgres>,
    id: Uuid,
    notes: Option<&str>,
) -> Result<DbAppointment> {
    let updated = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        UPDATE appointments
        SET notes = $2, updated_at = $3
        WHERE id = $1
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(notes)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(updated)
}

/// Whether the doctor has ever had an appointment with the patient.
pub async fn has_care_relationship(
    pool: &Pool<Postgres>,
    doctor_id: Uuid,
    patient_id: Uuid,
) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM appointments
            WHERE doctor_id = $1 AND patient_id = $2
        )
        "#,
    )
    .bind(doctor_id)
    .bind(patient_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}
