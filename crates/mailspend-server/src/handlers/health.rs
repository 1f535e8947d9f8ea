//! Health check handler

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Whether a refresh has populated the session
    pub session_populated: bool,
    /// Whether the remote classification path is configured
    pub remote_classifier: bool,
}

/// GET /api/health - Liveness and session status
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let session = state.session.read().await;
    Json(HealthResponse {
        status: "ok",
        session_populated: session.is_populated(),
        remote_classifier: state.pipeline.has_remote_classifier(),
    })
}
