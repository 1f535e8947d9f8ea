//! Subscription listing handler

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;
use mailspend_core::SubscriptionCandidate;

#[derive(Debug, Serialize)]
pub struct SubscriptionsResponse {
    pub subscriptions: Vec<SubscriptionCandidate>,
    /// Projected monthly cost of cycle-bearing candidates
    pub monthly_recurring_cost: f64,
    /// Projected yearly cost of cycle-bearing candidates
    pub yearly_recurring_cost: f64,
    /// Trials with no inferred cycle yet, excluded from the projections
    pub pending_trials: usize,
}

/// GET /api/subscriptions - List detected recurring charges
pub async fn list_subscriptions(State(state): State<Arc<AppState>>) -> Json<SubscriptionsResponse> {
    let session = state.session.read().await;
    Json(SubscriptionsResponse {
        subscriptions: session.subscriptions.clone(),
        monthly_recurring_cost: session.summary.monthly_recurring_cost,
        yearly_recurring_cost: session.summary.yearly_recurring_cost,
        pending_trials: session.summary.pending_trials,
    })
}
