// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
///
/// Pipeline stage failures are NOT errors: they are reported as
/// `PipelineOutcome::Failed`. `AppError` covers faults outside that taxonomy
/// (storage unavailable, corrupt configuration, ...).
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Install error: {0}")]
    Install(#[from] crate::port::InstallError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion is handled in the infra-sqlite crate
// by converting to AppError::Database(String)
