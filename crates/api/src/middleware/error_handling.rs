//! # Error Handling Middleware
//!
//! Maps domain errors to HTTP status codes and JSON error bodies so every
//! handler reports failures the same way.
//!
//! | Error              | Status |
//! |--------------------|--------|
//! | `NotFound`         | 404    |
//! | `Validation`       | 400    |
//! | `Authentication`   | 401    |
//! | `Authorization`    | 403    |
//! | `Conflict`         | 409    |
//! | `PolicyViolation`  | 422    |
//! | `Database`         | 500    |
//! | `Internal`         | 500    |
//!
//! Server-side failures are logged with their full detail and answered with
//! a generic message, so database errors never reach the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use medportal_core::errors::PortalError;

/// Application error wrapper that provides HTTP status code mapping
///
/// # Example
///
/// ```
/// use axum::Json;
/// use medportal_api::middleware::error_handling::AppError;
/// use medportal_core::errors::PortalError;
///
/// async fn handler(found: bool) -> Result<Json<&'static str>, AppError> {
///     if !found {
///         return Err(AppError(PortalError::NotFound("Appointment not found".to_string())));
///     }
///     Ok(Json("ok"))
/// }
/// # fn main() {}
/// ```
#[derive(Debug)]
pub struct AppError(pub PortalError);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            PortalError::NotFound(_) => StatusCode::NOT_FOUND,
            PortalError::Validation(_) => StatusCode::BAD_REQUEST,
            PortalError::Authentication(_) => StatusCode::UNAUTHORIZED,
            PortalError::Authorization(_) => StatusCode::FORBIDDEN,
            PortalError::Conflict(_) => StatusCode::CONFLICT,
            PortalError::PolicyViolation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PortalError::Database(_) | PortalError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self.0 {
            PortalError::PolicyViolation {
                required_notice_hours,
            } => json!({
                "error": self.0.to_string(),
                "required_notice_hours": required_notice_hours,
            }),
            PortalError::Database(_) | PortalError::Internal(_) => {
                tracing::error!("Request failed: {:?}", self.0);
                json!({ "error": "Internal server error" })
            }
            _ => json!({ "error": self.0.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Automatic conversion from PortalError to AppError
impl From<PortalError> for AppError {
    fn from(err: PortalError) -> Self {
        AppError(err)
    }
}

/// Automatic conversion from eyre::Report to AppError
///
/// Repository functions return `eyre::Result`, so their failures surface as
/// `PortalError::Database`.
impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        AppError(PortalError::Database(err))
    }
}

/// Maps a PortalError to an HTTP response
pub fn map_error(err: PortalError) -> Response {
    AppError(err).into_response()
}
