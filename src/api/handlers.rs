use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// User key. `userId` is accepted for older clients.
    #[serde(alias = "userId")]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub success: bool,
    pub message: String,
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Recomputes and stores the recommendation list for one user.
///
/// Body: `{"email": "..."}`. Responds 200 with the run's outcome message;
/// malformed bodies map to 400 and unknown users to 404, both in the same
/// `{success, message}` shape.
pub async fn refresh_recommendations(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> AppResult<Json<RefreshResponse>> {
    let Json(request) = payload.map_err(|e| AppError::InvalidInput(e.body_text()))?;

    let email = request.email.trim();
    if email.is_empty() {
        return Err(AppError::InvalidInput(
            "Missing 'email' in request body".to_string(),
        ));
    }

    let outcome = state.pipeline.refresh_for_user(email).await?;

    Ok(Json(RefreshResponse {
        success: true,
        message: outcome.message().to_string(),
    }))
}
