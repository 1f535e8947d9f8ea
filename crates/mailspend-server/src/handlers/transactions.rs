//! Transaction listing handler

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{AppError, AppState};
use mailspend_core::{Category, Transaction};

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    /// Filter by category (e.g. "entertainment")
    pub category: Option<String>,
    /// Filter by bank label (e.g. "sbi")
    pub bank: Option<String>,
    /// Inclusive start date (YYYY-MM-DD)
    pub from: Option<String>,
    /// Inclusive end date (YYYY-MM-DD)
    pub to: Option<String>,
}

/// GET /api/transactions - List session transactions with optional filters
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TransactionsQuery>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let category = params
        .category
        .as_deref()
        .map(|s| {
            s.parse::<Category>()
                .map_err(|e| AppError::bad_request(&e))
        })
        .transpose()?;

    let from = parse_date(params.from.as_deref(), "from")?;
    let to = parse_date(params.to.as_deref(), "to")?;

    let session = state.session.read().await;
    let transactions: Vec<Transaction> = session
        .transactions
        .iter()
        .filter(|tx| category.map_or(true, |c| tx.category == c))
        .filter(|tx| params.bank.as_deref().map_or(true, |b| tx.bank == b))
        .filter(|tx| from.map_or(true, |d| tx.date.date_naive() >= d))
        .filter(|tx| to.map_or(true, |d| tx.date.date_naive() <= d))
        .cloned()
        .collect();

    Ok(Json(transactions))
}

fn parse_date(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>, AppError> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
                AppError::bad_request(&format!("Invalid {} date format (use YYYY-MM-DD)", field))
            })
        })
        .transpose()
}
