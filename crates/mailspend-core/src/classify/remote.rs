//! Remote classification strategy
//!
//! HTTP client for the hosted classify endpoint. Sends a bounded excerpt of
//! the cleaned email text as JSON and maps the JSON response into the shared
//! [`Classification`] shape. Transient failures are retried a bounded number
//! of times; any terminal failure is surfaced so the categorizer can fall
//! back to the rules path.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ClassifierSettings;
use crate::error::{Error, Result};
use crate::models::Category;

use super::{Classification, Classify, ClassifyRequest};

/// Hosted classify endpoint client
pub struct RemoteClassifier {
    http_client: Client,
    endpoint: String,
    token: String,
    max_retries: u32,
    max_excerpt_chars: usize,
}

/// Wire request for the classify endpoint
#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    /// Cleaned email text excerpt, bounded by `max_excerpt_chars`
    text: &'a str,
    subject: &'a str,
    bank: &'a str,
    date: String,
}

/// Wire response from the classify endpoint
#[derive(Debug, Deserialize)]
struct WireResponse {
    merchant: String,
    amount: f64,
    #[serde(default)]
    currency: Option<String>,
    category: String,
    subscription: bool,
    #[serde(default)]
    trial: bool,
    #[serde(default = "default_confidence")]
    confidence: f64,
}

fn default_confidence() -> f64 {
    0.9
}

impl RemoteClassifier {
    pub fn new(settings: &ClassifierSettings, token: String) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            http_client,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            token,
            max_retries: settings.max_retries,
            max_excerpt_chars: settings.max_excerpt_chars,
        }
    }

    /// Build with an explicit endpoint (used by tests against the mock server)
    pub fn with_endpoint(endpoint: &str, token: &str, max_retries: u32) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: token.to_string(),
            max_retries,
            max_excerpt_chars: 2000,
        }
    }

    /// Truncate the body on a char boundary to bound the request payload
    fn excerpt<'a>(&self, body: &'a str) -> &'a str {
        match body.char_indices().nth(self.max_excerpt_chars) {
            Some((idx, _)) => &body[..idx],
            None => body,
        }
    }

    async fn call_once(&self, request: &ClassifyRequest) -> Result<WireResponse> {
        let wire = WireRequest {
            text: self.excerpt(&request.body),
            subject: &request.subject,
            bank: &request.bank,
            date: request.date.to_rfc3339(),
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&wire)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Classification(format!(
                "Classify endpoint returned {}",
                status
            )));
        }

        Ok(response.json::<WireResponse>().await?)
    }
}

/// Whether a failed attempt is worth retrying
fn is_transient(error: &Error) -> bool {
    match error {
        Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        Error::Classification(message) => {
            // Retry server-side failures and throttling, not client errors
            message.contains(StatusCode::TOO_MANY_REQUESTS.as_str())
                || message.contains("500")
                || message.contains("502")
                || message.contains("503")
                || message.contains("504")
        }
        _ => false,
    }
}

#[async_trait]
impl Classify for RemoteClassifier {
    async fn classify(&self, request: &ClassifyRequest) -> Result<Classification> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!(attempt, "Retrying classify call");
            }

            match self.call_once(request).await {
                Ok(wire) => {
                    // Unknown category strings degrade to Uncategorized
                    // rather than failing the whole classification
                    let category = wire.category.parse::<Category>().unwrap_or_else(|_| {
                        warn!(category = %wire.category, "Unknown category from classify endpoint");
                        Category::Uncategorized
                    });

                    return Ok(Classification {
                        merchant: wire.merchant,
                        amount: wire.amount.abs(),
                        currency: wire.currency.unwrap_or_else(|| "INR".to_string()),
                        category,
                        is_subscription: wire.subscription,
                        is_trial: wire.trial,
                        confidence: wire.confidence.clamp(0.0, 1.0),
                    });
                }
                Err(e) if is_transient(&e) && attempt < self.max_retries => {
                    warn!(attempt, error = %e, "Transient classify failure");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| Error::Classification("Classify retries exhausted".to_string())))
    }
}
