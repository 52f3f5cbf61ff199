use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Fetch failure, non-2xx response or an unparsable feed body.
    #[error("{0}")]
    Transport(String),

    /// Feed failed its structural checks.
    #[error("{0}")]
    Validation(String),

    /// A feed event is missing its match id or a team name.
    #[error("{0}")]
    Normalization(String),

    #[error("Database error during {op}: {source}")]
    Persistence {
        op: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Please sign in to access the admin panel")]
    Unauthorized,

    #[error("Access denied. Admin privileges required.")]
    Forbidden,

    #[error("A synchronization is already running")]
    SyncInProgress,

    #[error("Invalid bet slip: {0}")]
    InvalidBetSlip(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Wraps a datastore failure with the operation that issued it.
    pub fn persistence(op: &'static str, source: sqlx::Error) -> Self {
        AppError::Persistence { op, source }
    }

    /// Stable code used in diagnostics records.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Transport(_) | AppError::Http(_) => "TRANSPORT_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Normalization(_) => "NORMALIZATION_ERROR",
            AppError::Persistence { .. } | AppError::Migration(_) => "PERSISTENCE_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::SyncInProgress => "SYNC_IN_PROGRESS",
            AppError::InvalidBetSlip(_) => "INVALID_BET_SLIP",
            AppError::Io(_) => "UNKNOWN_ERROR",
        }
    }

    /// Only transport-class failures are worth another attempt.
    pub fn is_transport(&self) -> bool {
        matches!(self, AppError::Transport(_) | AppError::Http(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Transport(_) | AppError::Http(_) => StatusCode::BAD_GATEWAY,
            AppError::Validation(_) | AppError::Normalization(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Config(_) | AppError::InvalidBetSlip(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::SyncInProgress => StatusCode::CONFLICT,
            AppError::Persistence { .. } | AppError::Migration(_) | AppError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
