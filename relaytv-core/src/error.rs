use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Concurrent stream limit reached: {0}")]
    ConcurrencyLimit(String),

    #[error("Upstream unavailable: {url}: {reason}")]
    UpstreamUnavailable { url: String, reason: String },

    #[error("Transcoder launch failed: {0}")]
    ProcessLaunch(String),

    #[error("Command not allowed: {0}")]
    CommandNotAllowed(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Construct an `UpstreamUnavailable` error carrying the offending URL.
    pub fn upstream(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable error kind for API responses.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Database(_) => "database",
            Self::Serialization(_) => "serialization",
            Self::Authentication(_) => "authentication",
            Self::Authorization(_) => "authorization",
            Self::NotFound(_) => "not_found",
            Self::ConcurrencyLimit(_) => "concurrency_limit",
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::ProcessLaunch(_) => "process_launch",
            Self::CommandNotAllowed(_) => "command_not_allowed",
            Self::Configuration(_) => "configuration",
            Self::AlreadyExists(_) => "already_exists",
            Self::InvalidInput(_) => "invalid_input",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            // Map "no rows" to NotFound
            sqlx::Error::RowNotFound => Self::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().unwrap_or_default();
                match code.as_ref() {
                    // PostgreSQL unique_violation
                    "23505" => Self::AlreadyExists("Resource already exists".to_string()),
                    // PostgreSQL foreign_key_violation
                    "23503" => Self::NotFound("Referenced resource not found".to_string()),
                    // PostgreSQL check_violation
                    "23514" => Self::InvalidInput("Constraint check failed".to_string()),
                    // PostgreSQL not_null_violation
                    "23502" => Self::InvalidInput("Required field is missing".to_string()),
                    _ => Self::Database(err),
                }
            }
            _ => Self::Database(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_is_stable() {
        assert_eq!(
            Error::Authentication("bad password".into()).kind(),
            "authentication"
        );
        assert_eq!(
            Error::ConcurrencyLimit("2 of 2".into()).kind(),
            "concurrency_limit"
        );
        assert_eq!(
            Error::upstream("http://up.example/a.m3u8", "timeout").kind(),
            "upstream_unavailable"
        );
    }

    #[test]
    fn test_upstream_error_carries_url() {
        let err = Error::upstream("http://up.example/a.m3u8", "connect refused");
        let msg = err.to_string();
        assert!(msg.contains("http://up.example/a.m3u8"));
        assert!(msg.contains("connect refused"));
    }
}
