//! # Request Context
//!
//! Resolves the session cookie into the signed-in user for one request.
//! Handlers take a [`RequestContext`] argument instead of reading any shared
//! session state, and use it for role and CSRF checks.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use medportal_core::{errors::PortalError, models::user::Role};
use medportal_db::repositories::{session, user};
use uuid::Uuid;

use crate::{
    middleware::{auth, error_handling::AppError},
    ApiState,
};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "medportal_session";

/// The authenticated caller of the current request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user_id: Uuid,
    pub role: Role,
    pub session_token: String,
    pub csrf_token: String,
}

impl RequestContext {
    /// Rejects a mutating request whose submitted CSRF token does not match
    /// the session's.
    pub fn verify_csrf(&self, submitted: &str) -> Result<(), AppError> {
        if auth::tokens_match(&self.csrf_token, submitted) {
            Ok(())
        } else {
            tracing::warn!("CSRF token mismatch for user {}", self.user_id);
            Err(AppError(PortalError::Authorization(
                "Invalid CSRF token".to_string(),
            )))
        }
    }

    pub fn require_role(&self, allowed: &[Role]) -> Result<(), AppError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError(PortalError::Authorization(format!(
                "This action is not available to {} accounts",
                self.role
            ))))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[async_trait]
impl FromRequestParts<Arc<ApiState>> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ApiState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError(PortalError::Authentication("Not signed in".to_string())))?;

        let db_session = session::get_active_session(&state.db_pool, &token, Utc::now())
            .await?
            .ok_or_else(|| {
                AppError(PortalError::Authentication(
                    "Session expired, please sign in again".to_string(),
                ))
            })?;

        let db_user = user::get_user_by_id(&state.db_pool, db_session.user_id)
            .await?
            .ok_or_else(|| {
                AppError(PortalError::Authentication("Account no longer exists".to_string()))
            })?;

        Ok(RequestContext {
            user_id: db_user.id,
            role: db_user.role.parse()?,
            session_token: db_session.token,
            csrf_token: db_session.csrf_token,
        })
    }
}

/// Builds the cookie that carries a freshly issued session token.
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// A cookie that, when removed from the jar, clears the session cookie.
pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}
