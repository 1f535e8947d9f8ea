//! Test utilities for mailspend-core
//!
//! This module provides testing infrastructure including a mock classify
//! server that stands in for the hosted endpoint in integration tests.

use axum::{
    extract::Json,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::sync::oneshot;

/// Mock classify server for testing
///
/// Responses are keyword-driven and deterministic so tests can assert on
/// exact classifications. Requests without a bearer token get 401.
pub struct MockClassifyServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockClassifyServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let app = Router::new().route("/v1/classify", post(handle_classify));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Classify endpoint URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}/v1/classify", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockClassifyServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Deserialize)]
struct ClassifyRequestWire {
    text: String,
    subject: String,
    #[allow(dead_code)]
    bank: String,
    #[allow(dead_code)]
    date: String,
}

#[derive(Debug, Serialize)]
struct ClassifyResponseWire {
    merchant: String,
    amount: f64,
    currency: String,
    category: String,
    subscription: bool,
    trial: bool,
    confidence: f64,
}

async fn handle_classify(
    headers: HeaderMap,
    Json(request): Json<ClassifyRequestWire>,
) -> Result<Json<ClassifyResponseWire>, StatusCode> {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("Bearer ") && v.len() > "Bearer ".len())
        .unwrap_or(false);
    if !authorized {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let text = format!("{} {}", request.subject, request.text).to_lowercase();

    // Fixed keyword table so tests can assert exact outputs
    let (merchant, amount, category, subscription, trial) = if text.contains("netflix") {
        ("NETFLIX", 649.0, "entertainment", true, false)
    } else if text.contains("trialservicex") {
        ("TRIALSERVICEX", 1.0, "entertainment", true, true)
    } else if text.contains("swiggy") || text.contains("zomato") {
        ("SWIGGY", 350.0, "food_dining", false, false)
    } else if text.contains("atm") {
        ("ATM WITHDRAWAL", 2000.0, "atm_withdrawal", false, false)
    } else if text.contains("electricity") {
        ("STATE POWER BOARD", 1540.0, "bills_utilities", false, false)
    } else if text.contains("nonsense-category") {
        // Exercises the client's degrade-to-uncategorized path
        ("WEIRD MERCHANT", 10.0, "definitely_not_a_category", false, false)
    } else {
        ("UNKNOWN MERCHANT", 100.0, "other", false, false)
    };

    Ok(Json(ClassifyResponseWire {
        merchant: merchant.to_string(),
        amount,
        currency: "INR".to_string(),
        category: category.to_string(),
        subscription,
        trial,
        confidence: 0.92,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Categorizer, RemoteClassifier};
    use crate::models::{BodyKind, Category, ClassificationSource, EmailRecord};
    use chrono::Utc;

    fn record(subject: &str, body: &str) -> EmailRecord {
        EmailRecord {
            uid: 7,
            sender: "alerts@hdfcbank.net".to_string(),
            subject: subject.to_string(),
            date: Utc::now(),
            body: body.to_string(),
            body_kind: BodyKind::Plain,
        }
    }

    #[tokio::test]
    async fn test_remote_classification_end_to_end() {
        let server = MockClassifyServer::start().await;
        let remote = RemoteClassifier::with_endpoint(&server.url(), "test-token", 1);
        let categorizer = Categorizer::with_remote(remote, 100.0);

        let tx = categorizer
            .categorize(
                &record("HDFC Alert", "Rs. 649.00 debited towards NETFLIX"),
                "hdfc",
            )
            .await;

        assert_eq!(tx.source, ClassificationSource::Remote);
        assert_eq!(tx.merchant, "NETFLIX");
        assert_eq!(tx.category, Category::Entertainment);
        assert!(tx.is_subscription);
    }

    #[tokio::test]
    async fn test_unauthorized_falls_back_to_rules() {
        let server = MockClassifyServer::start().await;
        // Empty token: server rejects with 401, categorizer must fall back
        let remote = RemoteClassifier::with_endpoint(&server.url(), "", 0);
        let categorizer = Categorizer::with_remote(remote, 100.0);

        let tx = categorizer
            .categorize(
                &record("SBI Alert", "Rs. 500.00 debited at BIG BAZAAR"),
                "sbi",
            )
            .await;

        assert_eq!(tx.source, ClassificationSource::Rules);
        assert_eq!(tx.amount, 500.0);
    }

    #[tokio::test]
    async fn test_unknown_category_degrades_to_uncategorized() {
        let server = MockClassifyServer::start().await;
        let remote = RemoteClassifier::with_endpoint(&server.url(), "test-token", 0);
        let categorizer = Categorizer::with_remote(remote, 100.0);

        let tx = categorizer
            .categorize(&record("Alert", "nonsense-category purchase"), "hdfc")
            .await;

        assert_eq!(tx.source, ClassificationSource::Remote);
        assert_eq!(tx.category, Category::Uncategorized);
    }

    #[tokio::test]
    async fn test_dead_endpoint_falls_back_to_rules() {
        // Nothing listens here; connection fails fast
        let remote = RemoteClassifier::with_endpoint("http://127.0.0.1:1/v1/classify", "t", 0);
        let categorizer = Categorizer::with_remote(remote, 100.0);

        let tx = categorizer
            .categorize(
                &record("SBI Alert", "Rs. 250.00 debited at SWIGGY"),
                "sbi",
            )
            .await;
        assert_eq!(tx.source, ClassificationSource::Rules);
    }
}
