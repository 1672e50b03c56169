use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Utc};
use std::sync::Arc;
use medportal_core::{
    errors::PortalError,
    models::user::{
        normalize_email, validate_registration, LoginRequest, LogoutRequest, RegisterRequest,
        Role, SessionResponse, User,
    },
};
use medportal_db::repositories::{
    session,
    user::{self, NewUser},
};
use tracing::info;

use crate::{
    middleware::{
        auth,
        error_handling::AppError,
        session::{expired_session_cookie, session_cookie, RequestContext},
    },
    ApiState,
};

/// Self-service registration. New accounts are always patients; doctor
/// accounts are opened by an admin.
#[axum::debug_handler]
pub async fn register(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    validate_registration(&payload)?;

    let email = normalize_email(&payload.email);
    let password_hash = auth::hash_password(&payload.password)?;
    let phone = payload.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());

    let created = user::create_user(
        &state.db_pool,
        &NewUser {
            email: &email,
            password_hash: &password_hash,
            first_name: payload.first_name.trim(),
            last_name: payload.last_name.trim(),
            phone,
            role: Role::Patient,
        },
    )
    .await?
    .ok_or_else(|| PortalError::Validation("Email is already registered".to_string()))?;

    info!("Patient account registered: {}", created.id);
    Ok((StatusCode::CREATED, Json(created.try_into()?)))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<ApiState>>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>), AppError> {
    let invalid = || AppError(PortalError::Authentication("Invalid email or password".to_string()));

    let db_user = user::get_user_by_email(&state.db_pool, &normalize_email(&payload.email))
        .await?
        .ok_or_else(invalid)?;

    if !auth::verify_password(&db_user.password_hash, &payload.password)? {
        tracing::warn!("Failed login attempt for user {}", db_user.id);
        return Err(invalid());
    }

    let token = auth::generate_token();
    let csrf_token = auth::generate_token();
    let expires_at = Utc::now() + Duration::hours(state.session_ttl_hours);
    session::create_session(&state.db_pool, &token, db_user.id, &csrf_token, expires_at).await?;

    info!("User {} signed in", db_user.id);
    let jar = jar.add(session_cookie(token, state.cookie_secure));

    Ok((
        jar,
        Json(SessionResponse {
            user: db_user.try_into()?,
            csrf_token,
            expires_at,
        }),
    ))
}

#[axum::debug_handler]
pub async fn logout(
    State(state): State<Arc<ApiState>>,
    ctx: RequestContext,
    jar: CookieJar,
    Json(payload): Json<LogoutRequest>,
) -> Result<(CookieJar, StatusCode), AppError> {
    ctx.verify_csrf(&payload.csrf_token)?;

    session::delete_session(&state.db_pool, &ctx.session_token).await?;
    info!("User {} signed out", ctx.user_id);

    Ok((jar.remove(expired_session_cookie()), StatusCode::NO_CONTENT))
}

/// Returns the signed-in user and the CSRF token to submit with mutations.
#[axum::debug_handler]
pub async fn current_session(
    State(state): State<Arc<ApiState>>,
    ctx: RequestContext,
) -> Result<Json<SessionResponse>, AppError> {
    let db_session = session::get_active_session(&state.db_pool, &ctx.session_token, Utc::now())
        .await?
        .ok_or_else(|| PortalError::Authentication("Session expired".to_string()))?;
    let db_user = user::get_user_by_id(&state.db_pool, ctx.user_id)
        .await?
        .ok_or_else(|| PortalError::NotFound("User not found".to_string()))?;

    Ok(Json(SessionResponse {
        user: db_user.try_into()?,
        csrf_token: db_session.csrf_token,
        expires_at: db_session.expires_at,
    }))
}
