//! # Medical Record Handlers
//!
//! Patients read their own records. Doctors read and add records for
//! patients they have seen (any appointment, past or upcoming). Admins can
//! read everything but not author records.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use medportal_core::{
    errors::PortalError,
    models::{
        medical_record::{
            CreateMedicalRecordRequest, MedicalRecord, MedicalRecordListResponse,
            MedicalRecordQuery,
        },
        notification::NewNotification,
        user::Role,
    },
};
use medportal_db::{
    models::convert_all,
    repositories::{
        appointment,
        medical_record::{self, NewMedicalRecord},
    },
};
use uuid::Uuid;

use crate::{
    middleware::{error_handling::AppError, session::RequestContext},
    ApiState,
};

async fn ensure_treats(state: &ApiState, doctor_id: Uuid, patient_id: Uuid) -> Result<(), AppError> {
    if appointment::has_care_relationship(&state.db_pool, doctor_id, patient_id).await? {
        Ok(())
    } else {
        Err(AppError(PortalError::Authorization(
            "You have no appointments with this patient".to_string(),
        )))
    }
}

#[axum::debug_handler]
pub async fn list_records(
    State(state): State<Arc<ApiState>>,
    ctx: RequestContext,
    Query(query): Query<MedicalRecordQuery>,
) -> Result<Json<MedicalRecordListResponse>, AppError> {
    let patient_id = match ctx.role {
        Role::Patient => match query.patient_id {
            Some(other) if other != ctx.user_id => {
                return Err(AppError(PortalError::Authorization(
                    "Patients can only view their own records".to_string(),
                )));
            }
            _ => ctx.user_id,
        },
        Role::Doctor | Role::Admin => query.patient_id.ok_or_else(|| {
            PortalError::Validation("patient_id query parameter is required".to_string())
        })?,
    };

    if ctx.role == Role::Doctor {
        ensure_treats(&state, ctx.user_id, patient_id).await?;
    }

    let rows = medical_record::list_medical_records_for_patient(&state.db_pool, patient_id).await?;
    Ok(Json(MedicalRecordListResponse {
        records: convert_all(rows)?,
    }))
}

#[axum::debug_handler]
pub async fn get_record(
    State(state): State<Arc<ApiState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<MedicalRecord>, AppError> {
    let record: MedicalRecord = medical_record::get_medical_record_by_id(&state.db_pool, id)
        .await?
        .ok_or_else(|| PortalError::NotFound(format!("Medical record with ID {} not found", id)))?
        .try_into()?;

    match ctx.role {
        Role::Admin => {}
        Role::Patient if record.patient_id == ctx.user_id => {}
        Role::Doctor if record.doctor_id == ctx.user_id => {}
        Role::Doctor => ensure_treats(&state, ctx.user_id, record.patient_id).await?,
        Role::Patient => {
            return Err(AppError(PortalError::Authorization(
                "Patients can only view their own records".to_string(),
            )));
        }
    }

    Ok(Json(record))
}

#[axum::debug_handler]
pub async fn create_record(
    State(state): State<Arc<ApiState>>,
    ctx: RequestContext,
    Json(payload): Json<CreateMedicalRecordRequest>,
) -> Result<(StatusCode, Json<MedicalRecord>), AppError> {
    ctx.verify_csrf(&payload.csrf_token)?;
    ctx.require_role(&[Role::Doctor])?;

    let title = payload.title.trim();
    if title.is_empty() {
        return Err(AppError(PortalError::Validation("Title is required".to_string())));
    }

    ensure_treats(&state, ctx.user_id, payload.patient_id).await?;

    if let Some(appointment_id) = payload.appointment_id {
        let linked = appointment::get_appointment_by_id(&state.db_pool, appointment_id)
            .await?
            .ok_or_else(|| {
                PortalError::NotFound(format!("Appointment with ID {} not found", appointment_id))
            })?;
        if linked.doctor_id != ctx.user_id || linked.patient_id != payload.patient_id {
            return Err(AppError(PortalError::Validation(
                "The appointment does not belong to this doctor and patient".to_string(),
            )));
        }
    }

    let record: MedicalRecord = medical_record::create_medical_record(
        &state.db_pool,
        &NewMedicalRecord {
            patient_id: payload.patient_id,
            doctor_id: ctx.user_id,
            appointment_id: payload.appointment_id,
            record_type: payload.record_type,
            title,
            description: payload.description.as_deref(),
            file_path: payload.file_path.as_deref(),
        },
    )
    .await?
    .try_into()?;

    state.notifier.notify(
        NewNotification::new(
            record.patient_id,
            "New medical record",
            format!("Your doctor added a {}: {}", record.record_type, record.title),
        )
        .with_link(format!("/medical-records/{}", record.id)),
    );

    Ok((StatusCode::CREATED, Json(record)))
}
