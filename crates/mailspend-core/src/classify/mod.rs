//! Transaction classification
//!
//! A single `Classify` seam with two implementing strategies, selected by
//! availability of configuration:
//!
//! - [`RemoteClassifier`]: hosted model endpoint over HTTP
//! - [`RuleClassifier`]: deterministic keyword/regex fallback
//!
//! Both produce the same [`Classification`] shape, so downstream stages
//! never know which path ran. The [`Categorizer`] wires them together:
//! remote first when an API token exists, falling back to rules on any
//! remote failure. The rules path cannot fail.

mod remote;
mod rules;

pub use remote::RemoteClassifier;
pub use rules::RuleClassifier;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::Result;
use crate::models::{Category, ClassificationSource, EmailRecord, Transaction};

/// Input to a classification strategy: one cleaned transaction email
#[derive(Debug, Clone)]
pub struct ClassifyRequest {
    pub subject: String,
    /// Plain-text body (HTML already stripped by the fetcher)
    pub body: String,
    pub bank: String,
    pub date: DateTime<Utc>,
}

impl ClassifyRequest {
    /// Combined text used for keyword matching
    pub fn text(&self) -> String {
        format!("{} {}", self.subject, self.body)
    }
}

/// Output shape shared by both classification strategies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub merchant: String,
    pub amount: f64,
    pub currency: String,
    pub category: Category,
    pub is_subscription: bool,
    pub is_trial: bool,
    pub confidence: f64,
}

/// Interface implemented by both classification strategies
#[async_trait]
pub trait Classify: Send + Sync {
    async fn classify(&self, request: &ClassifyRequest) -> Result<Classification>;
}

/// Remote-with-fallback categorizer
///
/// Holds at most one remote strategy (present only when an API token was
/// configured) and always holds the rules strategy. When the remote path is
/// absent no network call is ever attempted.
pub struct Categorizer {
    remote: Option<RemoteClassifier>,
    rules: RuleClassifier,
}

impl Categorizer {
    /// Build from configuration; the remote path is enabled only when an
    /// API token can be resolved
    pub fn from_config(config: &Config) -> Self {
        let rules = RuleClassifier::new(config.detection.trial_amount_threshold);
        // api_token() already warns when it resolves nothing, so the
        // degradation is surfaced exactly once per run
        let remote = config
            .api_token()
            .map(|token| RemoteClassifier::new(&config.classifier, token));

        Self { remote, rules }
    }

    /// Rules-only categorizer (no remote path regardless of config)
    pub fn rules_only(trial_amount_threshold: f64) -> Self {
        Self {
            remote: None,
            rules: RuleClassifier::new(trial_amount_threshold),
        }
    }

    /// Categorizer with an explicit remote strategy (used by tests against
    /// the mock classify server)
    pub fn with_remote(remote: RemoteClassifier, trial_amount_threshold: f64) -> Self {
        Self {
            remote: Some(remote),
            rules: RuleClassifier::new(trial_amount_threshold),
        }
    }

    /// Whether the remote path is available
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Classify one email into a transaction
    ///
    /// Infallible by construction: the rules fallback always produces a
    /// result, at worst a low-confidence `Uncategorized` one.
    pub async fn categorize(&self, record: &EmailRecord, bank: &str) -> Transaction {
        let request = ClassifyRequest {
            subject: record.subject.clone(),
            body: record.body.clone(),
            bank: bank.to_string(),
            date: record.date,
        };

        let (classification, source) = match &self.remote {
            Some(remote) => match remote.classify(&request).await {
                Ok(c) => (c, ClassificationSource::Remote),
                Err(e) => {
                    warn!(uid = record.uid, error = %e, "Remote classification failed, using rules fallback");
                    (self.rules.classify_infallible(&request), ClassificationSource::Rules)
                }
            },
            None => (
                self.rules.classify_infallible(&request),
                ClassificationSource::Rules,
            ),
        };

        debug!(
            uid = record.uid,
            merchant = %classification.merchant,
            category = %classification.category,
            source = source.as_str(),
            "Classified transaction"
        );

        Transaction {
            email_uid: record.uid,
            merchant: classification.merchant,
            amount: classification.amount,
            currency: classification.currency,
            category: classification.category,
            bank: bank.to_string(),
            date: record.date,
            is_subscription: classification.is_subscription,
            is_trial: classification.is_trial,
            confidence: classification.confidence.clamp(0.0, 1.0),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BodyKind;

    fn record(subject: &str, body: &str) -> EmailRecord {
        EmailRecord {
            uid: 1,
            sender: "alerts@alerts.sbi.co.in".to_string(),
            subject: subject.to_string(),
            date: Utc::now(),
            body: body.to_string(),
            body_kind: BodyKind::Plain,
        }
    }

    #[tokio::test]
    async fn test_rules_only_never_calls_network() {
        // No remote configured: an unroutable endpoint in config must not matter
        let categorizer = Categorizer::rules_only(100.0);
        assert!(!categorizer.has_remote());

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
    async fn test_from_config_without_token_is_rules_only() {
        // No token anywhere: the remote path must not be constructed
        let mut config = Config::default();
        config.classifier.token_file =
            Some(std::path::PathBuf::from("/nonexistent/classify-token"));
        let categorizer = Categorizer::from_config(&config);
        assert!(!categorizer.has_remote());

        let tx = categorizer
            .categorize(&record("SBI Alert", "Rs. 100.00 debited"), "sbi")
            .await;
        assert_eq!(tx.source, ClassificationSource::Rules);
    }

    #[tokio::test]
    async fn test_malformed_text_yields_uncategorized() {
        let categorizer = Categorizer::rules_only(100.0);
        let tx = categorizer.categorize(&record("", ""), "unknown").await;
        assert_eq!(tx.category, Category::Uncategorized);
        assert!(tx.confidence < 0.5);
        assert!(tx.amount >= 0.0);
    }
}
