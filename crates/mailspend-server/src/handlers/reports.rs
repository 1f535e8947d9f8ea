//! Report handlers

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::AppState;
use mailspend_core::SpendingSummary;

/// GET /api/reports/summary - Aggregated spending summary for the session
pub async fn get_summary(State(state): State<Arc<AppState>>) -> Json<SpendingSummary> {
    let session = state.session.read().await;
    Json(session.summary.clone())
}
