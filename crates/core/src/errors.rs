use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Slot unavailable: {0}")]
    Conflict(String),

    #[error("Cancellation requires at least {required_notice_hours} hours notice")]
    PolicyViolation { required_notice_hours: i64 },

    #[error("Database error: {0}")]
    Database(#[from] eyre::Report),

    #[error("Internal server error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

pub type PortalResult<T> = Result<T, PortalError>;
