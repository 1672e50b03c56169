use axum::{body::to_bytes, http::StatusCode};
use medportal_api::middleware::{
    auth,
    error_handling::{map_error, AppError},
    session::RequestContext,
};
use medportal_core::{errors::PortalError, models::user::Role};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::Value;
use uuid::Uuid;

use crate::test_utils::TestContext;

fn context(role: Role) -> RequestContext {
    RequestContext {
        user_id: Uuid::new_v4(),
        role,
        session_token: auth::generate_token(),
        csrf_token: "csrf-token-value".to_string(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[rstest]
#[case::not_found(PortalError::NotFound("Appointment not found".to_string()), StatusCode::NOT_FOUND)]
#[case::validation(PortalError::Validation("Invalid input".to_string()), StatusCode::BAD_REQUEST)]
#[case::authentication(PortalError::Authentication("Not signed in".to_string()), StatusCode::UNAUTHORIZED)]
#[case::authorization(PortalError::Authorization("Not allowed".to_string()), StatusCode::FORBIDDEN)]
#[case::conflict(PortalError::Conflict("09:00-09:30".to_string()), StatusCode::CONFLICT)]
#[case::policy(PortalError::PolicyViolation { required_notice_hours: 24 }, StatusCode::UNPROCESSABLE_ENTITY)]
#[case::database(PortalError::Database(eyre::eyre!("connection refused")), StatusCode::INTERNAL_SERVER_ERROR)]
fn test_error_status_mapping(#[case] error: PortalError, #[case] expected: StatusCode) {
    let response = map_error(error);
    assert_eq!(response.status(), expected);
}

#[tokio::test]
async fn test_error_handling_internal() {
    let error = PortalError::Internal(Box::new(std::io::Error::new(
        std::io::ErrorKind::Other,
        "Internal error",
    )));

    let response = map_error(error);

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_policy_violation_reports_required_notice() {
    let response = map_error(PortalError::PolicyViolation {
        required_notice_hours: 24,
    });

    let body = body_json(response).await;
    assert_eq!(body["required_notice_hours"], 24);
    assert_eq!(
        body["error"],
        "Cancellation requires at least 24 hours notice"
    );
}

#[tokio::test]
async fn test_database_errors_are_not_leaked() {
    let response = map_error(PortalError::Database(eyre::eyre!(
        "relation \"appointments\" does not exist"
    )));

    let body = body_json(response).await;
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn test_conflict_message_is_returned() {
    let body = body_json(map_error(PortalError::Conflict("taken".to_string()))).await;
    assert_eq!(body["error"], "Slot unavailable: taken");
}

#[test]
fn test_eyre_report_becomes_server_error() {
    let error: AppError = eyre::eyre!("pool timed out").into();
    assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_hash_password() {
    let password = "test_password";
    let hashed = auth::hash_password(password).unwrap();

    assert_ne!(hashed, password);
    assert!(hashed.starts_with("$argon2"));
    // Fresh salt per call
    assert_ne!(hashed, auth::hash_password(password).unwrap());
}

#[test]
fn test_verify_password() {
    let hashed = auth::hash_password("correct horse").unwrap();

    assert!(auth::verify_password(&hashed, "correct horse").unwrap());
    assert!(!auth::verify_password(&hashed, "wrong horse").unwrap());
    assert!(auth::verify_password("not-a-phc-string", "correct horse").is_err());
}

#[test]
fn test_generate_token() {
    let first = auth::generate_token();
    let second = auth::generate_token();

    assert_eq!(first.len(), auth::TOKEN_LENGTH);
    assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_ne!(first, second);
}

#[test]
fn test_tokens_match() {
    assert!(auth::tokens_match("abc123", "abc123"));
    assert!(!auth::tokens_match("abc123", "abc124"));
    assert!(!auth::tokens_match("abc123", "abc12"));
    assert!(!auth::tokens_match("abc123", ""));
}

#[test]
fn test_verify_csrf() {
    let ctx = context(Role::Patient);

    assert!(ctx.verify_csrf("csrf-token-value").is_ok());
    let err = ctx.verify_csrf("forged").unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
}

#[test]
fn test_require_role() {
    let doctor = context(Role::Doctor);

    assert!(doctor.require_role(&[Role::Doctor, Role::Admin]).is_ok());
    let err = doctor.require_role(&[Role::Admin]).unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
    assert!(!doctor.is_admin());
    assert!(context(Role::Admin).is_admin());
}

// Mirrors the session lookup done by the request-context extractor.
async fn resolve_session(ctx: &TestContext, token: &'static str) -> Result<Uuid, AppError> {
    let session = ctx
        .session_repo
        .get_active_session(token, chrono::Utc::now())
        .await?
        .ok_or_else(|| PortalError::Authentication("Session expired, please sign in again".to_string()))?;
    Ok(session.user_id)
}

#[tokio::test]
async fn test_active_session_resolves_user() {
    let user_id = Uuid::new_v4();
    let mut ctx = TestContext::new();
    ctx.session_repo
        .expect_get_active_session()
        .withf(|token, _| token == "live-token")
        .returning(move |token, now| {
            Ok(Some(medportal_db::models::DbSession {
                token: token.to_string(),
                user_id,
                csrf_token: auth::generate_token(),
                expires_at: now + chrono::Duration::hours(1),
                created_at: now,
            }))
        });

    assert_eq!(resolve_session(&ctx, "live-token").await.unwrap(), user_id);
}

#[tokio::test]
async fn test_expired_session_is_unauthorized() {
    let mut ctx = TestContext::new();
    ctx.session_repo
        .expect_get_active_session()
        .returning(|_, _| Ok(None));

    let err = resolve_session(&ctx, "stale-token").await.unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}
