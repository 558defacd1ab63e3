//! Error types for gatehouse.
//!
//! One unified error with explicit variants for network failures, non-2xx
//! responses, authentication, field validation, malformed input, and local
//! storage.

use std::fmt;

use thiserror::Error;

use crate::envelope::{ApiErrorBody, FieldError};

/// The unified error type for gatehouse operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection or timeout failure before a response was received.
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// The API answered with a non-2xx status.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Authentication failed or the session can no longer be refreshed.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// The API rejected the request with structured field errors.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Malformed input (base URL, user id, payload).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// Token store or mock state could not be read or written.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl Error {
    /// Returns the HTTP status if this error came from an API response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http(e) => Some(e.status),
            Error::Validation(e) => Some(e.status),
            _ => None,
        }
    }

    /// Returns true if the caller must send the user back to login.
    pub fn is_login_required(&self) -> bool {
        matches!(
            self,
            Error::Auth(AuthError::LoginRequired | AuthError::RefreshRejected { .. })
        )
    }

    /// Build the error for a non-2xx response from its status and (possibly
    /// absent) error envelope.
    ///
    /// An envelope carrying field errors becomes [`Error::Validation`];
    /// everything else becomes [`Error::Http`].
    pub fn from_response(status: u16, body: Option<ApiErrorBody>) -> Self {
        match body {
            Some(body) if !body.errors.is_empty() => Error::Validation(ValidationError {
                status,
                code: body.code,
                message: body.message,
                errors: body.errors,
            }),
            Some(body) => Error::Http(HttpError {
                status,
                code: body.code,
                message: body.message,
            }),
            None => Error::Http(HttpError::new(status)),
        }
    }
}

/// Transport-level failures.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Connection could not be established.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request exceeded the configured timeout.
    #[error("request timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Any other transport failure (TLS, body read, decode).
    #[error("{message}")]
    Other { message: String },
}

/// A non-2xx response.
#[derive(Debug)]
pub struct HttpError {
    /// HTTP status code.
    pub status: u16,
    /// Error code from the error envelope, if present.
    pub code: Option<String>,
    /// Error message from the error envelope, if present.
    pub message: Option<String>,
}

impl HttpError {
    /// Create an error carrying only a status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            code: None,
            message: None,
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref code) = self.code {
            write!(f, " [{}]", code)?;
        }
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for HttpError {}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Retries are exhausted on 401; the user has to log in again.
    #[error("login required")]
    LoginRequired,

    /// The refresh token was missing, rejected, or the refresh call failed.
    #[error("token refresh rejected: {reason}")]
    RefreshRejected { reason: String },

    /// No tokens are stored.
    #[error("no active session")]
    NoSession,

    /// Login credentials were refused.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
}

/// Structured field errors returned by the API.
#[derive(Debug)]
pub struct ValidationError {
    /// HTTP status code.
    pub status: u16,
    /// Error code from the envelope.
    pub code: Option<String>,
    /// Top-level message from the envelope.
    pub message: Option<String>,
    /// Per-field errors.
    pub errors: Vec<FieldError>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message {
            Some(ref message) => write!(f, "{}", message)?,
            None => write!(f, "HTTP {}", self.status)?,
        }
        for error in &self.errors {
            write!(f, "; {}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid API base URL.
    #[error("invalid API URL '{value}': {reason}")]
    ApiUrl { value: String, reason: String },

    /// Invalid user id.
    #[error("invalid user id '{value}': {reason}")]
    UserId { value: String, reason: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}

/// Local persistence errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure.
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// Persisted data could not be parsed or written as JSON.
    #[error("corrupt data in {path}: {message}")]
    Corrupt { path: String, message: String },
}

impl StorageError {
    pub fn io(path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        StorageError::Io {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }

    pub fn corrupt(path: impl AsRef<std::path::Path>, err: serde_json::Error) -> Self {
        StorageError::Corrupt {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_body(errors: Vec<FieldError>) -> ApiErrorBody {
        ApiErrorBody {
            status: "error".to_string(),
            code: Some("VALIDATION_FAILED".to_string()),
            message: Some("Request validation failed".to_string()),
            errors,
            meta: None,
        }
    }

    #[test]
    fn field_errors_become_validation_error() {
        let body = error_body(vec![FieldError {
            field: "email".to_string(),
            message: "must be a valid email".to_string(),
            code: "INVALID_FORMAT".to_string(),
        }]);

        let err = Error::from_response(422, Some(body));
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(err.status(), Some(422));
        assert!(err.to_string().contains("email: must be a valid email"));
    }

    #[test]
    fn envelope_without_field_errors_is_http_error() {
        let err = Error::from_response(404, Some(error_body(vec![])));
        match err {
            Error::Http(e) => {
                assert_eq!(e.status, 404);
                assert_eq!(e.code.as_deref(), Some("VALIDATION_FAILED"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_envelope_keeps_status() {
        let err = Error::from_response(503, None);
        assert_eq!(err.to_string(), "HTTP error: HTTP 503");
    }

    #[test]
    fn login_required_detection() {
        assert!(Error::from(AuthError::LoginRequired).is_login_required());
        assert!(
            Error::from(AuthError::RefreshRejected {
                reason: "expired".to_string()
            })
            .is_login_required()
        );
        assert!(!Error::from(AuthError::NoSession).is_login_required());
    }
}
