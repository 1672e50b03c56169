use axum::http::StatusCode;
use axum_test::TestServer;
use medportal_api::build_router;
use medportal_core::models::notification::NewNotification;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::test_utils::{build_state, test_config};

fn server() -> (TestServer, tokio::sync::mpsc::UnboundedReceiver<NewNotification>) {
    let (state, receiver) = build_state();
    let app = build_router(state, &test_config());
    (TestServer::new(app).unwrap(), receiver)
}

#[tokio::test]
async fn test_health_check() {
    let (server, _notifications) = server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_version() {
    let (server, _notifications) = server();

    let body = server.get("/version").await.json::<Value>();

    assert_eq!(body["name"], "medportal-api");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let (server, _notifications) = server();

    let response = server.get("/api/appointments").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"], "Authentication error: Not signed in");

    let response = server
        .post("/api/appointments")
        .json(&json!({
            "csrf_token": "anything",
            "doctor_id": Uuid::new_v4(),
            "date": "2030-05-06",
            "start_time": "09:00:00",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = server.get("/api/chat/conversations").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = server.get("/api/settings").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (server, _notifications) = server();

    let response = server.get("/api/does-not-exist").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_notifier_queues_for_worker() {
    let (state, mut receiver) = build_state();
    let recipient = Uuid::new_v4();

    state
        .notifier
        .notify(NewNotification::new(recipient, "Appointment booked", "See you Monday"));

    let queued = receiver.recv().await.unwrap();
    assert_eq!(queued.recipient_id, recipient);
    assert_eq!(queued.title, "Appointment booked");
}
