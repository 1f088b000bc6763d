//! Error types for the SmartThings Find client

use thiserror::Error;

/// Result type alias for SmartThings Find operations
pub type Result<T> = std::result::Result<T, FindError>;

/// Error types for SmartThings Find operations
#[derive(Error, Debug)]
pub enum FindError {
    /// Session is no longer valid; the user must re-authenticate
    #[error("Authentication invalidated: {0}")]
    AuthInvalidated(String),

    /// Network-level failures on a per-device call
    #[error("Transport failure: {0}")]
    Transport(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing errors
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Vendor timestamp that does not match the YYYYMMDDhhmmss format
    #[error("Malformed timestamp: {0:?}")]
    MalformedTimestamp(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unexpected error outside the per-device fetch boundary
    #[error("Cycle aggregation failed: {0}")]
    CycleAggregation(String),

    /// Generic errors
    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl FindError {
    /// Create an auth-invalidated error
    pub fn auth<S: Into<String>>(msg: S) -> Self {
        Self::AuthInvalidated(msg.into())
    }

    /// Create a transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a malformed-timestamp error
    pub fn malformed_timestamp<S: Into<String>>(raw: S) -> Self {
        Self::MalformedTimestamp(raw.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a cycle aggregation error
    pub fn cycle_aggregation<S: Into<String>>(msg: S) -> Self {
        Self::CycleAggregation(msg.into())
    }

    /// Check if this error means the session must be re-authenticated.
    ///
    /// Auth errors are fatal to the whole polling cycle and are never
    /// retried automatically.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, FindError::AuthInvalidated(_))
    }

    /// Check if error is retryable on the host's own schedule
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FindError::Transport(_) | FindError::Http(_) | FindError::CycleAggregation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_are_never_retryable() {
        let err = FindError::auth("session expired");
        assert!(err.is_auth_error());
        assert!(!err.is_retryable());
    }

    #[test]
    fn transport_and_aggregation_errors_are_retryable() {
        assert!(FindError::transport("timeout").is_retryable());
        assert!(FindError::cycle_aggregation("join failed").is_retryable());
        assert!(!FindError::transport("timeout").is_auth_error());
    }

    #[test]
    fn malformed_timestamp_is_neither() {
        let err = FindError::malformed_timestamp("20x4");
        assert!(!err.is_auth_error());
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("20x4"));
    }
}
