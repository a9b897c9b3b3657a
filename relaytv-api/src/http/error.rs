// HTTP error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for HTTP handlers
pub type AppResult<T> = Result<T, AppError>;

/// Application error with HTTP status code and stable machine-readable kind
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_input", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "authentication", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "authorization", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for AppError {}

/// Error response JSON structure
#[derive(Debug, Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
    kind: String,
    status: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
            kind: self.kind.to_string(),
            status: status.as_u16(),
        });

        (status, body).into_response()
    }
}

/// Convert core errors to HTTP errors
impl From<relaytv_core::Error> for AppError {
    fn from(err: relaytv_core::Error) -> Self {
        use relaytv_core::Error;

        let kind = err.kind();
        match err {
            Error::Authentication(msg) => Self::new(StatusCode::UNAUTHORIZED, kind, msg),
            Error::Authorization(msg) | Error::CommandNotAllowed(msg) => {
                Self::new(StatusCode::FORBIDDEN, kind, msg)
            }
            Error::NotFound(msg) => Self::new(StatusCode::NOT_FOUND, kind, msg),
            Error::ConcurrencyLimit(msg) => Self::new(StatusCode::TOO_MANY_REQUESTS, kind, msg),
            Error::UpstreamUnavailable { url, reason } => {
                tracing::warn!(url = %url, reason = %reason, "upstream unavailable");
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    kind,
                    format!("Upstream unavailable: {url}"),
                )
            }
            Error::InvalidInput(msg) => Self::new(StatusCode::BAD_REQUEST, kind, msg),
            Error::AlreadyExists(msg) => Self::new(StatusCode::CONFLICT, kind, msg),
            Error::Database(e) => {
                tracing::error!("Database error: {}", e);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, kind, "Database error")
            }
            Error::Serialization(e) => {
                tracing::error!("Serialization error: {}", e);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    kind,
                    "Data processing error",
                )
            }
            Error::ProcessLaunch(msg) => {
                tracing::error!("Transcoder launch failed: {}", msg);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    kind,
                    "Failed to start stream",
                )
            }
            Error::Configuration(msg) => {
                tracing::error!("Configuration error: {}", msg);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, kind, msg)
            }
            Error::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    kind,
                    "Internal server error",
                )
            }
        }
    }
}

/// Convert anyhow errors to HTTP errors
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("Internal error: {}", err);
        Self::internal("Internal server error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaytv_core::Error;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::from(Error::Authentication("bad".into())).status,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(Error::Authorization("no sub".into())).status,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::from(Error::NotFound("gone".into())).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(Error::ConcurrencyLimit("2 of 2".into())).status,
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::from(Error::upstream("http://up/a.m3u8", "timeout")).status,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_kind_survives_mapping() {
        let err = AppError::from(Error::ConcurrencyLimit("2 of 2".into()));
        assert_eq!(err.kind, "concurrency_limit");
    }

    #[test]
    fn test_upstream_message_keeps_url_drops_reason() {
        let err = AppError::from(Error::upstream("http://up/a.m3u8", "connection refused"));
        assert!(err.message.contains("http://up/a.m3u8"));
        assert!(!err.message.contains("connection refused"));
    }
}
