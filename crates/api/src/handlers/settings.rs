use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use medportal_core::models::{
    settings::{validate_setting, SettingsResponse, SystemSetting, UpdateSettingRequest},
    user::Role,
};
use medportal_db::repositories::settings;

use crate::{
    middleware::{error_handling::AppError, session::RequestContext},
    ApiState,
};

#[axum::debug_handler]
pub async fn list_settings(
    State(state): State<Arc<ApiState>>,
    ctx: RequestContext,
) -> Result<Json<SettingsResponse>, AppError> {
    ctx.require_role(&[Role::Admin])?;

    let settings = settings::get_all_settings(&state.db_pool)
        .await?
        .into_iter()
        .map(SystemSetting::from)
        .collect();

    Ok(Json(SettingsResponse { settings }))
}

#[axum::debug_handler]
pub async fn update_setting(
    State(state): State<Arc<ApiState>>,
    ctx: RequestContext,
    Path(key): Path<String>,
    Json(payload): Json<UpdateSettingRequest>,
) -> Result<Json<SystemSetting>, AppError> {
    ctx.verify_csrf(&payload.csrf_token)?;
    ctx.require_role(&[Role::Admin])?;
    validate_setting(&key, &payload.value)?;

    let updated = settings::upsert_setting(&state.db_pool, key.trim(), payload.value.trim()).await?;
    Ok(Json(updated.into()))
}
