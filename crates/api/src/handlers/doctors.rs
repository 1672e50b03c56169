use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use medportal_core::{
    errors::PortalError,
    models::{
        appointment::{BookedSlot, BookedSlotsQuery, BookedSlotsResponse},
        user::{
            normalize_email, validate_password, CreateDoctorRequest, Doctor, DoctorListResponse,
            Role,
        },
    },
};
use medportal_db::repositories::{
    appointment,
    doctor::{self, NewDoctorProfile},
    user::NewUser,
};
use uuid::Uuid;

use crate::{
    middleware::{auth, error_handling::AppError, session::RequestContext},
    ApiState,
};

async fn load_doctor(state: &ApiState, id: Uuid) -> Result<Doctor, AppError> {
    let found = doctor::get_doctor_by_id(&state.db_pool, id)
        .await?
        .ok_or_else(|| PortalError::NotFound(format!("Doctor with ID {} not found", id)))?;

    Ok(found.into())
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<ApiState>>,
    _ctx: RequestContext,
) -> Result<Json<DoctorListResponse>, AppError> {
    let doctors = doctor::list_doctors(&state.db_pool)
        .await?
        .into_iter()
        .map(Doctor::from)
        .collect();

    Ok(Json(DoctorListResponse { doctors }))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<ApiState>>,
    _ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Doctor>, AppError> {
    Ok(Json(load_doctor(&state, id).await?))
}

/// Intervals already taken on a doctor's calendar for one date, so clients
/// can offer only free times.
#[axum::debug_handler]
pub async fn booked_slots(
    State(state): State<Arc<ApiState>>,
    _ctx: RequestContext,
    Path(id): Path<Uuid>,
    Query(query): Query<BookedSlotsQuery>,
) -> Result<Json<BookedSlotsResponse>, AppError> {
    load_doctor(&state, id).await?;

    let slots = appointment::get_doctor_appointments_on(&state.db_pool, id, query.date)
        .await?
        .into_iter()
        .map(|a| BookedSlot {
            start_time: a.start_time,
            end_time: a.end_time,
        })
        .collect();

    Ok(Json(BookedSlotsResponse {
        doctor_id: id,
        date: query.date,
        slots,
    }))
}

#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<Arc<ApiState>>,
    ctx: RequestContext,
    Json(payload): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<Doctor>), AppError> {
    ctx.verify_csrf(&payload.csrf_token)?;
    ctx.require_role(&[Role::Admin])?;

    let email = normalize_email(&payload.email);
    if !email.contains('@') {
        return Err(AppError(PortalError::Validation("A valid email is required".to_string())));
    }
    if payload.specialization.trim().is_empty() || payload.license_number.trim().is_empty() {
        return Err(AppError(PortalError::Validation(
            "Specialization and license number are required".to_string(),
        )));
    }
    validate_password(&payload.password)?;

    let password_hash = auth::hash_password(&payload.password)?;
    let created = doctor::create_doctor(
        &state.db_pool,
        &NewUser {
            email: &email,
            password_hash: &password_hash,
            first_name: payload.first_name.trim(),
            last_name: payload.last_name.trim(),
            phone: payload.phone.as_deref(),
            role: Role::Doctor,
        },
        &NewDoctorProfile {
            specialization: payload.specialization.trim(),
            license_number: payload.license_number.trim(),
            bio: payload.bio.as_deref(),
        },
    )
    .await?
    .ok_or_else(|| PortalError::Validation("Email is already registered".to_string()))?;

    tracing::info!("Admin {} created doctor account {}", ctx.user_id, created.user_id);
    Ok((StatusCode::CREATED, Json(created.into())))
}
