//! # MedPortal API
//!
//! The API crate provides the web server for the MedPortal healthcare portal.
//! It exposes JSON endpoints for appointment booking, patient-doctor chat,
//! medical records, profiles, notifications and system settings.
//!
//! ## Architecture
//!
//! This crate follows a layered architecture:
//!
//! - **Routes**: Define API endpoints and URL structure
//! - **Handlers**: Implement request processing logic
//! - **Middleware**: Authentication, request context and error handling
//! - **Notifier**: Background persistence of user notifications
//! - **Config**: Handle environment and application configuration
//!
//! The API uses Axum as the web framework and SQLx for database interactions.

/// Configuration module for API settings
pub mod config;
/// Request handlers that implement business logic
pub mod handlers;
/// Middleware for authentication, request context and error handling
pub mod middleware;
/// Asynchronous notification persistence
pub mod notifier;
/// Route definitions and API endpoint structure
pub mod routes;

use std::{sync::Arc, time::Duration};

use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use eyre::Result;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::notifier::Notifier;

/// Shared application state that is accessible to all request handlers
///
/// # Example
///
/// ```rust,ignore
/// let state = Arc::new(ApiState::new(db_pool, Notifier::spawn(db_pool.clone()), &config));
/// let app = build_router(state, &config);
/// ```
pub struct ApiState {
    /// PostgreSQL connection pool for database operations
    pub db_pool: PgPool,
    /// Queue for user notifications
    pub notifier: Notifier,
    /// Lifetime of newly issued sessions, in hours
    pub session_ttl_hours: i64,
    /// Whether session cookies carry the `Secure` attribute
    pub cookie_secure: bool,
}

impl ApiState {
    pub fn new(db_pool: PgPool, notifier: Notifier, config: &config::ApiConfig) -> Self {
        Self {
            db_pool,
            notifier,
            session_ttl_hours: config.session_ttl_hours,
            cookie_secure: config.cookie_secure,
        }
    }
}

/// Assembles every route group and the cross-cutting layers.
pub fn build_router(state: Arc<ApiState>, config: &config::ApiConfig) -> Router {
    let app = Router::new()
        // Health check endpoints
        .merge(routes::health::routes())
        // Login, logout and session endpoints
        .merge(routes::auth::routes())
        // Profile management endpoints
        .merge(routes::profile::routes())
        // Doctor directory endpoints
        .merge(routes::doctors::routes())
        // Appointment booking endpoints
        .merge(routes::appointments::routes())
        // Patient-doctor messaging endpoints
        .merge(routes::chat::routes())
        // Medical record endpoints
        .merge(routes::medical_records::routes())
        // Notification endpoints
        .merge(routes::notifications::routes())
        // System settings endpoints
        .merge(routes::settings::routes())
        // Attach shared state to all routes
        .with_state(state);

    // Apply CORS configuration if origins are specified
    let app = match &config.cors_origins {
        Some(origins) => {
            let allowed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("Ignoring invalid CORS origin: {}", origin);
                        None
                    }
                })
                .collect();

            let cors = CorsLayer::new()
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .allow_origin(allowed)
                .allow_credentials(true);

            app.layer(cors)
        }
        None => app,
    };

    app.layer(
        tower::ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout))),
    )
}

/// Starts the API server with the provided configuration and database connection
///
/// Installs the tracing subscriber, spawns the notification worker, builds
/// the router and serves until the process is stopped.
pub async fn start_server(config: config::ApiConfig, db_pool: PgPool) -> Result<()> {
    // Initialize tracing for logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let notifier = Notifier::spawn(db_pool.clone());
    let state = Arc::new(ApiState::new(db_pool, notifier, &config));
    let app = build_router(state, &config);

    // Start the HTTP server
    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
