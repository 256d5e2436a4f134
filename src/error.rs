use reqwest::StatusCode;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The proxy answered 5xx. Usually Moodle behind it hiccuped.
    #[error("Server error {status}: {message}")]
    TransientServer { status: u16, message: String },

    #[error("Authentication required: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The backend refused the request; the message is its own.
    #[error("{0}")]
    Rejected(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::TransientServer { .. })
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, AppError::Auth(_))
    }

    /// Classify a non-success HTTP status. `message` is whatever the
    /// backend put in its `error` field, if anything.
    pub fn from_status(status: StatusCode, message: Option<String>) -> Self {
        let message = message.unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Auth(message),
            s if s.is_server_error() => AppError::TransientServer {
                status: s.as_u16(),
                message,
            },
            _ => AppError::Rejected(message),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return AppError::MalformedResponse(e.to_string());
        }
        if let Some(status) = e.status() {
            return AppError::from_status(status, None);
        }
        if !e.is_timeout() && !e.is_connect() {
            error!("unexpected transport error: {}", e);
        }
        AppError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::MalformedResponse(e.to_string())
    }
}
