//! # API Configuration Module
//!
//! This module handles loading and managing configuration for the MedPortal API server.
//! It retrieves configuration values from environment variables and provides defaults
//! where appropriate.
//!
//! ## Environment Variables
//!
//! The following environment variables are used:
//!
//! - `API_HOST`: The host address to bind the server to (default: "0.0.0.0")
//! - `API_PORT`: The port to listen on (default: 3000)
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `LOG_LEVEL`: Logging level (default: "info")
//! - `API_CORS_ORIGINS`: Comma-separated list of allowed CORS origins
//! - `API_REQUEST_TIMEOUT_SECONDS`: Per-request timeout (default: 30)
//! - `SESSION_TTL_HOURS`: Lifetime of a login session (default: 12)
//! - `SESSION_COOKIE_SECURE`: Mark the session cookie `Secure` (default: false)

use eyre::{Result, WrapErr};
use std::env;
use tracing::Level;

/// Configuration for the MedPortal API server
///
/// # Example
///
/// ```no_run
/// use eyre::Result;
/// use medportal_api::config::ApiConfig;
///
/// fn example() -> Result<()> {
///     let config = ApiConfig::from_env()?;
///     println!("Starting server on {}:{}", config.host, config.port);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host address for the API server (e.g., "127.0.0.1", "0.0.0.0")
    pub host: String,

    /// Port for the API server to listen on
    pub port: u16,

    /// PostgreSQL database connection string
    pub database_url: String,

    /// Log level for the application
    pub log_level: Level,

    /// CORS allowed origins (optional)
    pub cors_origins: Option<Vec<String>>,

    /// Request timeout in seconds
    pub request_timeout: u64,

    /// How long a login session stays valid, in hours
    pub session_ttl_hours: i64,

    /// Whether the session cookie is restricted to HTTPS
    pub cookie_secure: bool,
}

impl ApiConfig {
    /// Creates a new ApiConfig from environment variables
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The DATABASE_URL environment variable is not set
    /// - The API_PORT value cannot be parsed as a u16
    /// - SESSION_TTL_HOURS is set but is not a positive number
    pub fn from_env() -> Result<Self> {
        // Network settings
        let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("API_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .wrap_err("Invalid API_PORT value")?;

        // Database settings
        let database_url = env::var("DATABASE_URL")
            .wrap_err("DATABASE_URL environment variable must be set")?;

        let log_level = parse_log_level(&env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()));

        // CORS settings
        let cors_origins = env::var("API_CORS_ORIGINS").ok().map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        // Performance settings
        let request_timeout = env::var("API_REQUEST_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        // Session settings
        let session_ttl_hours: i64 = env::var("SESSION_TTL_HOURS")
            .unwrap_or_else(|_| "12".to_string())
            .parse()
            .wrap_err("Invalid SESSION_TTL_HOURS value")?;
        if session_ttl_hours <= 0 {
            eyre::bail!("SESSION_TTL_HOURS must be positive");
        }
        let cookie_secure = matches!(
            env::var("SESSION_COOKIE_SECURE").unwrap_or_default().to_lowercase().as_str(),
            "1" | "true" | "yes"
        );

        Ok(Self {
            host,
            port,
            database_url,
            log_level,
            cors_origins,
            request_timeout,
            session_ttl_hours,
            cookie_secure,
        })
    }

    /// Returns the server address as a string (e.g., "127.0.0.1:8080")
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Maps a `LOG_LEVEL` value to a tracing level, defaulting to INFO.
pub fn parse_log_level(value: &str) -> Level {
    match value.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}
