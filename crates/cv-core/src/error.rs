//! # AppError
//!
//! Centralized error handling for the campvoice client.
//! Remote failures are mapped here so state holders can decide between
//! rolling back, asking for a new login, or ignoring the intent.

use thiserror::Error;

/// The primary error type for all remote and state-holder operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Missing, expired or rejected token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Connectivity failure or timeout before a response was received.
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a non-2xx status.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// A 2xx response whose body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// An intent referenced an id absent from local state.
    #[error("{0} not found locally")]
    NotFound(String),

    /// Input rejected before any request was sent.
    #[error("validation error: {0}")]
    Validation(String),

    /// Local cache failure.
    #[error("cache error: {0}")]
    Cache(String),
}

impl AppError {
    pub fn missing_session() -> Self {
        AppError::Unauthorized("please log in again".to_string())
    }

    /// Transport-level failures, as opposed to rejections by the backend.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Network(_))
    }

    /// Failures of a request that was actually attempted against the backend.
    pub fn is_rollback_trigger(&self) -> bool {
        matches!(
            self,
            AppError::Network(_) | AppError::Server { .. } | AppError::InvalidResponse(_)
        )
    }

    /// Short transient text for a toast or snackbar.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Unauthorized(_) => "Session expired. Please log in again.".to_string(),
            AppError::Network(_) => "Network error. Please check your connection.".to_string(),
            AppError::Server { status, .. } => format!("Request failed ({status}). Try again later."),
            AppError::InvalidResponse(_) => "Unexpected response from the server.".to_string(),
            AppError::NotFound(what) => format!("{what} is no longer available."),
            AppError::Validation(msg) => msg.clone(),
            AppError::Cache(_) => "Local storage is unavailable.".to_string(),
        }
    }
}

/// A specialized Result type for campvoice logic.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollback_triggers_are_request_failures() {
        assert!(AppError::Network("reset".into()).is_rollback_trigger());
        assert!(AppError::Server { status: 500, message: String::new() }.is_rollback_trigger());
        assert!(AppError::InvalidResponse("eof".into()).is_rollback_trigger());
        assert!(!AppError::missing_session().is_rollback_trigger());
        assert!(!AppError::Validation("empty".into()).is_rollback_trigger());
    }

    #[test]
    fn server_message_mentions_status() {
        let err = AppError::Server { status: 503, message: "down".into() };
        assert_eq!(err.user_message(), "Request failed (503). Try again later.");
    }
}
