use axum::{routing::get, Router};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/doctors",
            get(handlers::doctors::list_doctors).post(handlers::doctors::create_doctor),
        )
        .route("/api/doctors/:id", get(handlers::doctors::get_doctor))
        .route(
            "/api/doctors/:id/booked-slots",
            get(handlers::doctors::booked_slots),
        )
}
