use axum::{routing::get, Router};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/appointments",
            get(handlers::appointments::list_appointments)
                .post(handlers::appointments::book_appointment),
        )
        .route(
            "/api/appointments/:id",
            get(handlers::appointments::get_appointment)
                .put(handlers::appointments::update_appointment)
                .delete(handlers::appointments::cancel_appointment),
        )
}
