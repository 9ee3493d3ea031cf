//! Unified application error types for RoadHelp.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// No geolocation fix is available (failed, denied, or not yet reported).
    PositionUnavailable,
    /// The durable help-request record could not be created.
    RequestCreation,
    /// An acceptance did not match the session's open request.
    StaleAcceptance,
    /// The helper roster query failed.
    CandidateFetch,
    /// The session has no identity (token missing or undecodable).
    Authentication,
    /// Input validation failed.
    Validation,
    /// A conflict occurred (request already open, request already accepted).
    Conflict,
    /// The realtime channel or the request/response transport failed.
    Transport,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// A configuration error occurred.
    Configuration,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PositionUnavailable => write!(f, "POSITION_UNAVAILABLE"),
            Self::RequestCreation => write!(f, "REQUEST_CREATION_FAILED"),
            Self::StaleAcceptance => write!(f, "STALE_ACCEPTANCE"),
            Self::CandidateFetch => write!(f, "CANDIDATE_FETCH_FAILED"),
            Self::Authentication => write!(f, "AUTHENTICATION"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Transport => write!(f, "TRANSPORT"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout RoadHelp.
///
/// Crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a position-unavailable error.
    pub fn position_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PositionUnavailable, message)
    }

    /// Create a request-creation error.
    pub fn request_creation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestCreation, message)
    }

    /// Create a stale-acceptance error.
    pub fn stale_acceptance(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StaleAcceptance, message)
    }

    /// Create a candidate-fetch error.
    pub fn candidate_fetch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CandidateFetch, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Re-tag this error with a different kind, keeping message and cause.
    pub fn into_kind(self, kind: ErrorKind) -> Self {
        Self { kind, ..self }
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Internal, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind() {
        let err = AppError::request_creation("service unreachable");
        assert_eq!(err.to_string(), "REQUEST_CREATION_FAILED: service unreachable");
    }

    #[test]
    fn test_into_kind_keeps_message() {
        let err = AppError::transport("connection refused").into_kind(ErrorKind::RequestCreation);
        assert_eq!(err.kind, ErrorKind::RequestCreation);
        assert_eq!(err.message, "connection refused");
    }

    #[test]
    fn test_json_error_maps_to_serialization() {
        let err: AppError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert_eq!(err.kind, ErrorKind::Serialization);
    }
}
