//! Error types for tunecast-sv
//!
//! Defines service-level error types using thiserror; the HTTP layer maps
//! each variant to a status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for tunecast-sv
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Track, folder or file not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed control input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Catalog root or folder could not be enumerated
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Playback engine errors
    #[error("Playback error: {0}")]
    Playback(String),

    /// Client registry is no longer running
    #[error("Registry error: {0}")]
    Registry(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using tunecast-sv Error
pub type Result<T> = std::result::Result<T, Error>;

impl From<tunecast_common::Error> for Error {
    fn from(err: tunecast_common::Error) -> Self {
        match err {
            tunecast_common::Error::Config(msg) => Error::Config(msg),
        }
    }
}

impl Error {
    /// HTTP status reported to control clients
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Registry(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(Error::BadRequest("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::Catalog("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::Registry("gone".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_common_error_conversion() {
        let err: Error = tunecast_common::Error::Config("bad".into()).into();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
