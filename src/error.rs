//! Error types for the progdata API server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// A specialized `Result` type for progdata operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The primary error type for all operations within the API server.
#[derive(Debug, Error)]
pub enum Error {
    /// The client requested a projection key that is not registered for the
    /// resource. Surfaced as 400, never silently defaulted.
    #[error("Invalid projection: \"{0}\"")]
    InvalidProjection(String),

    /// The client supplied a query-parameter key that is neither a default
    /// accepted parameter nor a registered filter. Surfaced as 400.
    #[error("Invalid filter: \"{0}\"")]
    InvalidFilter(String),

    /// An upload endpoint received no file or an unparseable file.
    #[error("Ingestion input error: {0}")]
    IngestionInput(String),

    /// A filter, shape augmentation, or ingestion diff referenced a record
    /// that does not exist. Aborts the enclosing transaction.
    #[error("Referential integrity error: {0}")]
    ReferentialIntegrity(String),

    /// The requested record was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A write payload failed validation against its shape contract.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The resource registry was misconfigured at startup.
    #[error("Registry error: {0}")]
    Registry(String),

    /// An unexpected internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// An error from the underlying I/O system.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An error that occurred during data serialization or deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// The standard JSON response body for an API error.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// A human-readable error message.
    pub error: String,
    /// A machine-readable error code string.
    pub code: String,
}

impl Error {
    /// Returns the appropriate HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidProjection(_) => StatusCode::BAD_REQUEST,
            Error::InvalidFilter(_) => StatusCode::BAD_REQUEST,
            Error::IngestionInput(_) => StatusCode::BAD_REQUEST,
            Error::ReferentialIntegrity(_) => StatusCode::CONFLICT,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a machine-readable error code string for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidProjection(_) => "INVALID_PROJECTION",
            Error::InvalidFilter(_) => "INVALID_FILTER",
            Error::IngestionInput(_) => "INGESTION_INPUT",
            Error::ReferentialIntegrity(_) => "REFERENTIAL_INTEGRITY",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::Registry(_) => "REGISTRY_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.error_code().to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
