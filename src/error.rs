use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Recoverable reasons the similarity engine can decline to produce a
/// ranking. The stored recommendation list is untouched when any of these
/// is returned.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InsufficientData {
    #[error("Not enough movie data to compute similarities")]
    NotEnoughMovies,

    #[error("Insufficient vocabulary to build the feature space")]
    EmptyVocabulary,

    #[error("Could not build a taste profile from the liked movies")]
    EmptyProfile,
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upstream fetch failed: {0}")]
    UpstreamFetch(String),

    #[error("{0}")]
    InsufficientData(#[from] InsufficientData),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
