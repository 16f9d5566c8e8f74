use crate::server::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, warn};

/// Body of `POST /log`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SearchPayload {
    /// The search text.
    pub keyword: String,
    /// Dedup key for debouncing.
    pub session_id: String,
    /// Defaults to empty when omitted.
    #[serde(default)]
    pub user_id: String,
}

/// Axum handler for incoming search events.
///
/// Route: `POST /log`
///
/// Any body that does not deserialize into a [`SearchPayload`] (bad JSON,
/// wrong field types, a missing required field, a non-JSON content type) is
/// answered with 400. A failed write is answered with 500.
pub async fn log_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SearchPayload>, JsonRejection>,
) -> impl IntoResponse {
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected search payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "invalid payload"})),
            );
        }
    };

    if let Err(e) = state
        .logger
        .save_search(&payload.keyword, &payload.session_id, &payload.user_id)
        .await
    {
        error!(session_id = %payload.session_id, error = %e, "Failed to log search");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": "failed to store search"})),
        );
    }

    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}
