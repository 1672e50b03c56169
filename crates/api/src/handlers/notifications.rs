use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use medportal_core::{
    errors::PortalError,
    models::notification::{MarkNotificationReadRequest, Notification, NotificationListResponse},
};
use medportal_db::repositories::notification;
use uuid::Uuid;

use crate::{
    middleware::{error_handling::AppError, session::RequestContext},
    ApiState,
};

/// How many of the most recent notifications are returned.
const NOTIFICATION_PAGE_SIZE: i64 = 50;

#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<Arc<ApiState>>,
    ctx: RequestContext,
) -> Result<Json<NotificationListResponse>, AppError> {
    let notifications: Vec<Notification> =
        notification::list_notifications_for_user(&state.db_pool, ctx.user_id, NOTIFICATION_PAGE_SIZE)
            .await?
            .into_iter()
            .map(Notification::from)
            .collect();
    let unread_count = notifications.iter().filter(|n| !n.is_read).count();

    Ok(Json(NotificationListResponse {
        notifications,
        unread_count,
    }))
}

#[axum::debug_handler]
pub async fn mark_read(
    State(state): State<Arc<ApiState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<MarkNotificationReadRequest>,
) -> Result<StatusCode, AppError> {
    ctx.verify_csrf(&payload.csrf_token)?;

    if notification::mark_notification_read(&state.db_pool, id, ctx.user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError(PortalError::NotFound(format!(
            "Notification with ID {} not found",
            id
        ))))
    }
}
