use axum::{
    routing::{get, put},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/profile",
            get(handlers::profile::get_profile).put(handlers::profile::update_profile),
        )
        .route("/api/profile/password", put(handlers::profile::change_password))
}
