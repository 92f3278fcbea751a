//! Error handling.
//!
//! Two tiers exist. Request errors are [`Error`] values caught at the handler
//! boundary and rendered as `{"error": "<message>"}` with the matching status.
//! Startup errors are [`StartupError`] values returned from the bootstrap and
//! turned into a non-zero exit code by the binary.
//!
//! Domain errors implement [`IntoApiError`] so handlers can use `?`:
//!
//! ```rust
//! use otel_sample::error::{Error, IntoApiError};
//!
//! enum LookupError {
//!     Missing(i32),
//! }
//!
//! impl IntoApiError for LookupError {
//!     fn into_api_error(self) -> Error {
//!         match self {
//!             LookupError::Missing(id) => Error::not_found(format!("user {} not found", id)),
//!         }
//!     }
//! }
//! ```

use std::fmt;

use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::database::DbError;
use crate::observability::TelemetryError;
use crate::response::{BoxBody, IntoResponse, JSON_CONTENT_TYPE, with_body};

/// The JSON envelope returned for every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// An error produced while serving a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub status: StatusCode,
    pub message: String,
}

impl Error {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Creates a 400 Bad Request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Creates a 404 Not Found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Creates a 500 Internal Server Error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.message.clone(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for Error {}

/// Converts a domain error into an [`Error`].
pub trait IntoApiError {
    fn into_api_error(self) -> Error;
}

impl<T: IntoApiError> From<T> for Error {
    fn from(err: T) -> Self {
        err.into_api_error()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> http::Response<BoxBody> {
        let body = serde_json::to_vec(&self.body()).unwrap_or_default();
        with_body(self.status, JSON_CONTENT_TYPE, body)
    }
}

/// A type alias for `Result<T, Error>`, the return type of handlers.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors raised before the server starts accepting requests.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("tracer initialization failed: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("failed to install log subscriber: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),
    #[error("database initialization failed: {0}")]
    Database(#[from] DbError),
    #[error("server failed: {0}")]
    Io(#[from] std::io::Error),
}
