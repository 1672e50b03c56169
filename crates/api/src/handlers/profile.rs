use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use medportal_core::{
    errors::PortalError,
    models::user::{validate_password, ChangePasswordRequest, UpdateProfileRequest, User},
};
use medportal_db::repositories::{session, user};

use crate::{
    middleware::{auth, error_handling::AppError, session::RequestContext},
    ApiState,
};

/// Trims an optional name field, rejecting one that is present but blank.
fn non_blank<'a>(field: &str, value: Option<&'a str>) -> Result<Option<&'a str>, PortalError> {
    match value.map(str::trim) {
        Some("") => Err(PortalError::Validation(format!("{} must not be empty", field))),
        other => Ok(other),
    }
}

#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<Arc<ApiState>>,
    ctx: RequestContext,
) -> Result<Json<User>, AppError> {
    let db_user = user::get_user_by_id(&state.db_pool, ctx.user_id)
        .await?
        .ok_or_else(|| PortalError::NotFound("User not found".to_string()))?;

    Ok(Json(db_user.try_into()?))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<Arc<ApiState>>,
    ctx: RequestContext,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    ctx.verify_csrf(&payload.csrf_token)?;

    let first_name = non_blank("First name", payload.first_name.as_deref())?;
    let last_name = non_blank("Last name", payload.last_name.as_deref())?;
    let phone = payload.phone.as_deref().map(str::trim);

    let updated = user::update_profile(&state.db_pool, ctx.user_id, first_name, last_name, phone).await?;

    Ok(Json(updated.try_into()?))
}

/// Changes the password and signs out every other session of the user.
#[axum::debug_handler]
pub async fn change_password(
    State(state): State<Arc<ApiState>>,
    ctx: RequestContext,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    ctx.verify_csrf(&payload.csrf_token)?;

    let db_user = user::get_user_by_id(&state.db_pool, ctx.user_id)
        .await?
        .ok_or_else(|| PortalError::NotFound("User not found".to_string()))?;

    if !auth::verify_password(&db_user.password_hash, &payload.current_password)? {
        return Err(AppError(PortalError::Authentication(
            "Current password is incorrect".to_string(),
        )));
    }
    validate_password(&payload.new_password)?;

    let password_hash = auth::hash_password(&payload.new_password)?;
    user::update_password_hash(&state.db_pool, ctx.user_id, &password_hash).await?;
    let revoked =
        session::delete_sessions_for_user(&state.db_pool, ctx.user_id, Some(&ctx.session_token))
            .await?;

    tracing::info!(
        "User {} changed password; {} other sessions revoked",
        ctx.user_id, revoked
    );
    Ok(StatusCode::NO_CONTENT)
}
