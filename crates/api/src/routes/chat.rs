use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/chat/conversations",
            get(handlers::chat::list_conversations).post(handlers::chat::start_conversation),
        )
        .route(
            "/api/chat/conversations/:id",
            get(handlers::chat::get_conversation)
                .put(handlers::chat::update_conversation)
                .delete(handlers::chat::close_conversation),
        )
        .route(
            "/api/chat/conversations/:id/messages",
            post(handlers::chat::send_message),
        )
}
