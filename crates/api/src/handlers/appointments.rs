//! # Appointment Handlers
//!
//! Booking, listing, status changes and soft cancellation.
//!
//! Booking validates the requested slot in the core scheduling rules and
//! then hands it to the repository, which re-checks it inside a transaction
//! holding the doctor's row lock. Cancellation goes through the notice-period
//! policy for patients; doctors and admins may cancel at any time.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDateTime, Utc};
use std::sync::Arc;
use medportal_core::{
    cancellation::ensure_cancellation_allowed,
    errors::{PortalError, PortalResult},
    models::{
        appointment::{
            Appointment, AppointmentListQuery, AppointmentListResponse, AppointmentStatus,
            BookAppointmentRequest, CancelAppointmentRequest, UpdateAppointmentRequest,
        },
        notification::NewNotification,
        user::Role,
    },
    scheduling::{ensure_in_future, Slot},
};
use medportal_db::{
    models::convert_all,
    repositories::{appointment, settings},
};
use tracing::info;
use uuid::Uuid;

use crate::{
    middleware::{error_handling::AppError, session::RequestContext},
    ApiState,
};

/// Admins see every appointment; everyone else only their own.
pub fn ensure_can_view(appointment: &Appointment, user_id: Uuid, role: Role) -> PortalResult<()> {
    if role == Role::Admin || appointment.is_participant(user_id) {
        Ok(())
    } else {
        Err(PortalError::Authorization(
            "You are not a participant in this appointment".to_string(),
        ))
    }
}

/// Decides whether `role` may move `appointment` to `requested` at `now`.
///
/// Patients may only cancel, and only within the notice policy. Doctors and
/// admins may apply any allowed transition.
pub fn authorize_status_change(
    appointment: &Appointment,
    role: Role,
    requested: AppointmentStatus,
    notice_hours: i64,
    now: NaiveDateTime,
) -> PortalResult<()> {
    match (role, requested) {
        (_, AppointmentStatus::Cancelled) => {
            ensure_cancellation_allowed(appointment, role, notice_hours, now)
        }
        (Role::Patient, _) => Err(PortalError::Authorization(
            "Patients can only cancel appointments".to_string(),
        )),
        (Role::Doctor | Role::Admin, next) => appointment.status.ensure_transition(next),
    }
}

/// Notifications for everyone on the appointment except the person who
/// changed it.
pub fn status_change_notifications(appointment: &Appointment, actor_id: Uuid) -> Vec<NewNotification> {
    let (title, message) = match appointment.status {
        AppointmentStatus::Cancelled => (
            "Appointment cancelled",
            format!(
                "The appointment on {} at {} has been cancelled",
                appointment.date,
                appointment.start_time.format("%H:%M")
            ),
        ),
        status => (
            "Appointment updated",
            format!(
                "The appointment on {} at {} is now {}",
                appointment.date,
                appointment.start_time.format("%H:%M"),
                status
            ),
        ),
    };

    [appointment.patient_id, appointment.doctor_id]
        .into_iter()
        .filter(|recipient| *recipient != actor_id)
        .map(|recipient| {
            NewNotification::new(recipient, title, message.clone())
                .with_link(format!("/appointments/{}", appointment.id))
        })
        .collect()
}

async fn load_appointment(state: &ApiState, id: Uuid) -> Result<Appointment, AppError> {
    let row = appointment::get_appointment_by_id(&state.db_pool, id)
        .await?
        .ok_or_else(|| PortalError::NotFound(format!("Appointment with ID {} not found", id)))?;

    Ok(row.try_into()?)
}

async fn apply_status_change(
    state: &ApiState,
    ctx: &RequestContext,
    current: &Appointment,
    requested: AppointmentStatus,
) -> Result<Appointment, AppError> {
    let scheduling = settings::load_scheduling_settings(&state.db_pool).await?;
    authorize_status_change(
        current,
        ctx.role,
        requested,
        scheduling.cancellation_notice_hours,
        Utc::now().naive_utc(),
    )?;

    let updated: Appointment =
        appointment::transition_status(&state.db_pool, current.id, current.status, requested)
            .await?
            .try_into()?;

    info!(
        "Appointment {} moved from {} to {} by user {}",
        updated.id, current.status, updated.status, ctx.user_id
    );
    for notification in status_change_notifications(&updated, ctx.user_id) {
        state.notifier.notify(notification);
    }

    Ok(updated)
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<ApiState>>,
    ctx: RequestContext,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<AppointmentListResponse>, AppError> {
    let rows = match ctx.role {
        Role::Patient => {
            appointment::list_appointments_for_patient(&state.db_pool, ctx.user_id, query.status)
                .await?
        }
        Role::Doctor => {
            appointment::list_appointments_for_doctor(&state.db_pool, ctx.user_id, query.status)
                .await?
        }
        Role::Admin => appointment::list_all_appointments(&state.db_pool, query.status).await?,
    };

    Ok(Json(AppointmentListResponse {
        appointments: convert_all(rows)?,
    }))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<ApiState>>,
    ctx: RequestContext,
    Json(payload): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    ctx.verify_csrf(&payload.csrf_token)?;
    ctx.require_role(&[Role::Patient])?;

    let scheduling = settings::load_scheduling_settings(&state.db_pool).await?;
    let duration = payload
        .duration_minutes
        .unwrap_or(scheduling.default_duration_minutes);
    let slot = Slot::from_start(payload.start_time, duration)?;
    ensure_in_future(payload.date, payload.start_time, Utc::now().naive_utc())?;

    let reason = payload
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|reason| !reason.is_empty());

    let booked: Appointment = appointment::book_appointment(
        &state.db_pool,
        ctx.user_id,
        payload.doctor_id,
        payload.date,
        slot,
        reason,
    )
    .await?
    .try_into()?;

    info!(
        "Patient {} booked appointment {} with doctor {} on {} at {}",
        ctx.user_id, booked.id, booked.doctor_id, booked.date, booked.start_time
    );
    state.notifier.notify(
        NewNotification::new(
            booked.doctor_id,
            "New appointment",
            format!(
                "A patient booked an appointment on {} at {}",
                booked.date,
                booked.start_time.format("%H:%M")
            ),
        )
        .with_link(format!("/appointments/{}", booked.id)),
    );

    Ok((StatusCode::CREATED, Json(booked)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<ApiState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    let found = load_appointment(&state, id).await?;
    ensure_can_view(&found, ctx.user_id, ctx.role)?;

    Ok(Json(found))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<ApiState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    ctx.verify_csrf(&payload.csrf_token)?;

    if payload.status.is_none() && payload.notes.is_none() {
        return Err(AppError(PortalError::Validation(
            "Nothing to update: provide a status or notes".to_string(),
        )));
    }

    if payload.notes.is_some() {
        ctx.require_role(&[Role::Doctor, Role::Admin])?;
    }

    let mut current = load_appointment(&state, id).await?;
    ensure_can_view(&current, ctx.user_id, ctx.role)?;

    if let Some(requested) = payload.status {
        current = apply_status_change(&state, &ctx, &current, requested).await?;
    }

    if let Some(notes) = &payload.notes {
        let notes = Some(notes.trim()).filter(|n| !n.is_empty());
        current = appointment::update_notes(&state.db_pool, id, notes)
            .await?
            .try_into()?;
    }

    Ok(Json(current))
}

/// Soft-cancels an appointment. The row is kept with status `cancelled`.
#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<ApiState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    ctx.verify_csrf(&payload.csrf_token)?;

    let current = load_appointment(&state, id).await?;
    ensure_can_view(&current, ctx.user_id, ctx.role)?;

    let cancelled = apply_status_change(&state, &ctx, &current, AppointmentStatus::Cancelled).await?;
    Ok(Json(cancelled))
}
