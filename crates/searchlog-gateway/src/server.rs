use crate::handler::log_handler;
use axum::{extract::State, response::IntoResponse, routing::get, routing::post, Json, Router};
use searchlog_debounce::SearchLogger;
use std::sync::Arc;
use tracing::warn;

/// Shared application state.
pub struct AppState {
    /// Write path every accepted event goes through.
    pub logger: Arc<SearchLogger>,
}

/// Builds the ingest router.
pub struct GatewayServer;

impl GatewayServer {
    /// Router with `POST /log` and `GET /health`, ready for `axum::serve`.
    pub fn build(logger: Arc<SearchLogger>) -> Router {
        let state = Arc::new(AppState { logger });

        Router::new()
            .route("/log", post(log_handler))
            .route("/health", get(health_handler))
            .with_state(state)
    }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let pending = match state.logger.pending().await {
        Ok(n) => Some(n),
        Err(e) => {
            warn!(error = %e, "Could not read pending count");
            None
        }
    };
    Json(serde_json::json!({
        "status": "ok",
        "service": "searchlog",
        "pending": pending,
    }))
}
