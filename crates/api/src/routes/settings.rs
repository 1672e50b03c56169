use axum::{
    routing::{get, put},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/settings", get(handlers::settings::list_settings))
        .route("/api/settings/:key", put(handlers::settings::update_setting))
}
