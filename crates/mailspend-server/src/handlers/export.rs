//! Export handlers

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, Response, StatusCode},
};
use serde::Deserialize;
use tracing::info;

use crate::{AppError, AppState};
use mailspend_core::{to_csv, to_json};

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// Export format: csv or json
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "csv".to_string()
}

/// GET /api/export/transactions - Download session transactions as a file
pub async fn export_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExportQuery>,
) -> Result<Response<Body>, AppError> {
    let session = state.session.read().await;

    match params.format.as_str() {
        "csv" => {
            let csv = to_csv(&session.transactions)?;
            info!("Exported {} transactions to CSV", session.transactions.len());

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
                .header(
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"transactions.csv\"",
                )
                .body(Body::from(csv))
                .map_err(|e| AppError::internal(&e.to_string()))
        }
        "json" => {
            let json = to_json(&session.transactions)?;
            info!("Exported {} transactions to JSON", session.transactions.len());

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "application/json")
                .header(
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"transactions.json\"",
                )
                .body(Body::from(json))
                .map_err(|e| AppError::internal(&e.to_string()))
        }
        _ => Err(AppError::bad_request("Invalid format. Use 'csv' or 'json'")),
    }
}
