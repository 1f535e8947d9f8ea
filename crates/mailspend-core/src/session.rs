//! Session state and the analysis pipeline
//!
//! All analysis results live in a [`Session`] that exists only for the
//! lifetime of the process (or, on the server, until the next refresh).
//! Nothing is written to disk; logging out or resetting drops everything.
//!
//! The pipeline is a fixed linear flow: fetch, identify bank, classify,
//! detect subscriptions, aggregate. Each stage consumes the previous
//! stage's output; there is no cross-stage back-channel.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::banks::identify_bank;
use crate::classify::Categorizer;
use crate::config::Config;
use crate::detect::SubscriptionDetector;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::models::{ClassificationSource, EmailRecord, SubscriptionCandidate, Transaction};
use crate::report::{summarize, SpendingSummary};

/// Counters for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Emails downloaded and parsed
    pub emails_fetched: usize,
    /// Emails that failed to download or parse and were skipped
    pub emails_skipped: usize,
    /// Transactions classified by the remote endpoint
    pub classified_remote: usize,
    /// Transactions classified by the rules fallback
    pub classified_rules: usize,
    /// Recurring-charge candidates found
    pub subscriptions_found: usize,
}

/// In-memory analysis state for one session
///
/// Everything here is derived; a reset is always safe because the next run
/// rebuilds it from the mailbox.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub transactions: Vec<Transaction>,
    pub subscriptions: Vec<SubscriptionCandidate>,
    pub summary: SpendingSummary,
    pub stats: RunStats,
    /// When the last successful run finished
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Whether a pipeline run has populated this session
    pub fn is_populated(&self) -> bool {
        self.refreshed_at.is_some()
    }

    /// Drop all analysis state
    pub fn reset(&mut self) {
        *self = Session::default();
        info!("Session reset, all analysis state dropped");
    }
}

/// The fetch-to-summary pipeline
pub struct Pipeline {
    config: Config,
    categorizer: Categorizer,
    detector: SubscriptionDetector,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        let categorizer = Categorizer::from_config(&config);
        let detector = SubscriptionDetector::new(config.detection.clone());
        Self {
            config,
            categorizer,
            detector,
        }
    }

    /// Pipeline with an explicit categorizer (used by tests to avoid the
    /// token lookup in [`Categorizer::from_config`])
    pub fn with_categorizer(config: Config, categorizer: Categorizer) -> Self {
        let detector = SubscriptionDetector::new(config.detection.clone());
        Self {
            config,
            categorizer,
            detector,
        }
    }

    /// Whether the remote classification path is available
    pub fn has_remote_classifier(&self) -> bool {
        self.categorizer.has_remote()
    }

    /// Run the full pipeline against the configured mailbox
    pub async fn run(
        &self,
        since: Option<NaiveDate>,
        before: Option<NaiveDate>,
    ) -> Result<Session> {
        let password = self.config.mailbox_password()?;
        let fetcher = Fetcher::new(self.config.mailbox.clone(), password);
        let outcome = fetcher.fetch(since, before).await?;

        let mut session = self.analyze(&outcome.records).await;
        session.stats.emails_skipped = outcome.skipped;
        Ok(session)
    }

    /// Classify, detect, and aggregate a batch of fetched records
    ///
    /// Split out from [`Pipeline::run`] so the downstream stages can be
    /// exercised without a live mailbox.
    pub async fn analyze(&self, records: &[EmailRecord]) -> Session {
        let mut transactions = Vec::with_capacity(records.len());
        for record in records {
            let bank = identify_bank(&record.sender, &record.subject);
            transactions.push(self.categorizer.categorize(record, bank).await);
        }

        let subscriptions = self.detector.detect(&transactions);

        // Reconcile the subscription flag with detection results so the
        // summary split reflects the detector, not just per-email keywords
        for tx in &mut transactions {
            if !tx.is_subscription {
                let key = crate::detect::normalize_merchant(&tx.merchant);
                tx.is_subscription = subscriptions
                    .iter()
                    .any(|c| crate::detect::normalize_merchant(&c.merchant) == key);
            }
        }

        let summary = summarize(&transactions, &subscriptions);
        let stats = RunStats {
            emails_fetched: records.len(),
            emails_skipped: 0,
            classified_remote: transactions
                .iter()
                .filter(|t| t.source == ClassificationSource::Remote)
                .count(),
            classified_rules: transactions
                .iter()
                .filter(|t| t.source == ClassificationSource::Rules)
                .count(),
            subscriptions_found: subscriptions.len(),
        };

        info!(
            transactions = transactions.len(),
            subscriptions = subscriptions.len(),
            remote = stats.classified_remote,
            rules = stats.classified_rules,
            "Analysis complete"
        );

        Session {
            transactions,
            subscriptions,
            summary,
            stats,
            refreshed_at: Some(Utc::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BodyKind;
    use chrono::TimeZone;

    fn record(uid: u32, sender: &str, subject: &str, body: &str, day: u32) -> EmailRecord {
        EmailRecord {
            uid,
            sender: sender.to_string(),
            subject: subject.to_string(),
            date: Utc.with_ymd_and_hms(2024, 1, day, 9, 0, 0).unwrap(),
            body: body.to_string(),
            body_kind: BodyKind::Plain,
        }
    }

    fn rules_pipeline() -> Pipeline {
        Pipeline::with_categorizer(Config::default(), Categorizer::rules_only(100.0))
    }

    #[tokio::test]
    async fn test_analyze_builds_full_session() {
        let pipeline = rules_pipeline();
        let records = vec![
            record(
                1,
                "alerts@alerts.sbi.co.in",
                "SBI Debit Alert",
                "Rs. 500.00 debited at BIG BAZAAR on 05-01-24",
                5,
            ),
            record(
                2,
                "alerts@hdfcbank.net",
                "HDFC Bank Alert",
                "Rs. 649.00 debited towards NETFLIX subscription renewal",
                10,
            ),
        ];

        let session = pipeline.analyze(&records).await;
        assert!(session.is_populated());
        assert_eq!(session.transactions.len(), 2);
        assert_eq!(session.stats.classified_rules, 2);
        assert_eq!(session.stats.classified_remote, 0);
        assert_eq!(session.transactions[0].bank, "sbi");
        assert_eq!(session.transactions[1].bank, "hdfc");
        assert_eq!(session.summary.transaction_count, 2);
    }

    #[tokio::test]
    async fn test_detector_backfills_subscription_flag() {
        let pipeline = rules_pipeline();
        // Three monthly Netflix charges, none of which says "subscription"
        let records = vec![
            record(1, "alerts@hdfcbank.net", "Alert", "Rs. 649.00 debited at NETFLIX on 05-01-24", 5),
            record(2, "alerts@hdfcbank.net", "Alert", "Rs. 649.00 debited at NETFLIX on 04-02-24", 5),
            record(3, "alerts@hdfcbank.net", "Alert", "Rs. 649.00 debited at NETFLIX on 06-03-24", 5),
        ];
        // Spread the dates a month apart so the detector sees a cycle
        let records: Vec<EmailRecord> = records
            .into_iter()
            .enumerate()
            .map(|(i, mut r)| {
                r.date = Utc.with_ymd_and_hms(2024, 1 + i as u32, 5, 9, 0, 0).unwrap();
                r
            })
            .collect();

        let session = pipeline.analyze(&records).await;
        assert_eq!(session.subscriptions.len(), 1);
        assert!(session.transactions.iter().all(|t| t.is_subscription));
        assert!(session.summary.yearly_recurring_cost > 0.0);
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let pipeline = rules_pipeline();
        let records = vec![record(
            1,
            "alerts@alerts.sbi.co.in",
            "SBI Alert",
            "Rs. 250.00 debited at SWIGGY",
            5,
        )];

        let mut session = pipeline.analyze(&records).await;
        assert!(session.is_populated());

        session.reset();
        assert!(!session.is_populated());
        assert!(session.transactions.is_empty());
        assert!(session.subscriptions.is_empty());
        assert_eq!(session.summary, SpendingSummary::default());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let pipeline = rules_pipeline();
        let session = pipeline.analyze(&[]).await;
        assert!(session.is_populated());
        assert_eq!(session.stats.emails_fetched, 0);
        assert_eq!(session.summary.transaction_count, 0);
    }
}
