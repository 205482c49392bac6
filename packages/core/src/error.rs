use std::error::Error;
use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Failures reaching or understanding a chain's RPC endpoint.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("chain {chain} unavailable: {message}")]
    Unavailable { chain: String, message: String },
    #[error("chain {chain} returned malformed data: {message}")]
    Malformed { chain: String, message: String },
    #[error("chain {0} is not configured")]
    UnknownChain(String),
}

/// Failures of the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
}

/// Unified application error.
///
/// `NotFound` is an expected outcome of a query that found nothing even
/// after backfilling, and is kept apart from the two outage kinds so the
/// transport layer can answer it differently.
#[derive(Debug)]
pub enum AppError {
    ChainUnavailable(String),
    StoreUnavailable(String),
    NotFound(String),
    InvalidInput(String),
    Config(String),
    Server(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ChainUnavailable(msg) => write!(f, "Chain unavailable: {}", msg),
            AppError::StoreUnavailable(msg) => write!(f, "Store unavailable: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::Config(msg) => write!(f, "Config error: {}", msg),
            AppError::Server(msg) => write!(f, "Server error: {}", msg),
        }
    }
}

impl Error for AppError {}

impl From<ChainError> for AppError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::UnknownChain(chain) => {
                AppError::InvalidInput(format!("unsupported chain {}", chain))
            }
            other => AppError::ChainUnavailable(other.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::StoreUnavailable(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::ChainUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_) | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));

        (status, body).into_response()
    }
}
