//! Session lifecycle handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AppError, AppState};
use mailspend_core::RunStats;

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    /// Only consider emails on or after this date (YYYY-MM-DD)
    pub since: Option<String>,
    /// Only consider emails before this date (YYYY-MM-DD)
    pub before: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub stats: RunStats,
    pub refreshed_at: chrono::DateTime<chrono::Utc>,
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::bad_request(&format!("Invalid {} date format (use YYYY-MM-DD)", field)))
}

/// POST /api/session/refresh - Run the mailbox analysis and replace the
/// session state
pub async fn refresh_session(
    State(state): State<Arc<AppState>>,
    body: Option<Json<RefreshRequest>>,
) -> Result<Json<RefreshResponse>, AppError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let since = request
        .since
        .as_deref()
        .map(|s| parse_date(s, "since"))
        .transpose()?;
    let before = request
        .before
        .as_deref()
        .map(|s| parse_date(s, "before"))
        .transpose()?;

    info!(?since, ?before, "Refreshing session from mailbox");
    let session = state.pipeline.run(since, before).await?;

    let stats = session.stats.clone();
    let refreshed_at = session
        .refreshed_at
        .ok_or_else(|| AppError::internal("Refresh produced no timestamp"))?;

    *state.session.write().await = session;

    Ok(Json(RefreshResponse {
        stats,
        refreshed_at,
    }))
}

/// POST /api/session/logout - Drop all session state
pub async fn logout_session(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    state.session.write().await.reset();
    Json(serde_json::json!({ "status": "logged_out" }))
}
