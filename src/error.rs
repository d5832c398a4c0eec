use thiserror::Error;

/// Main error type for the execution engine
#[derive(Error, Debug)]
pub enum DeskError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Request or venue-constraint violation detected before any external
    /// side effect; safely retryable after correction.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The venue rejected or failed to process a submission/cancellation.
    /// The venue's own message is embedded so callers can distinguish
    /// engine-level from venue-level causes.
    #[error("failed to {operation}: {message}")]
    Execution { operation: String, message: String },

    /// Requested order or credential does not exist or does not belong to
    /// the caller.
    #[error("Not found: {0}")]
    NotFound(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl DeskError {
    /// Wrap a venue-side failure in the stable execution envelope.
    pub fn execution(operation: impl Into<String>, message: impl std::fmt::Display) -> Self {
        DeskError::Execution {
            operation: operation.into(),
            message: message.to_string(),
        }
    }
}

/// Result type alias for DeskError
pub type Result<T> = std::result::Result<T, DeskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_error_keeps_stable_envelope() {
        let err = DeskError::execution("submit order", "insufficient funds");
        assert_eq!(err.to_string(), "failed to submit order: insufficient funds");
    }
}
