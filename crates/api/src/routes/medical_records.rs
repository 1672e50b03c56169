use axum::{routing::get, Router};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/medical-records",
            get(handlers::medical_records::list_records)
                .post(handlers::medical_records::create_record),
        )
        .route(
            "/api/medical-records/:id",
            get(handlers::medical_records::get_record),
        )
}
