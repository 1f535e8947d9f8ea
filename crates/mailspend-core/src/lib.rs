//! Mailspend Core Library
//!
//! Shared functionality for the Mailspend transaction-insights tool:
//! - IMAP fetcher with a bounded blocking worker pool
//! - Bank identification from sender/subject signatures
//! - Transaction classification (hosted endpoint with rules fallback)
//! - Recurring-charge detection over billing-cycle gaps
//! - Spending aggregation and CSV/JSON export
//! - Session-scoped pipeline state

pub mod banks;
pub mod classify;
pub mod config;
pub mod detect;
pub mod error;
pub mod export;
pub mod fetch;
pub mod models;
pub mod report;
pub mod session;

/// Test utilities including the mock classify server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use banks::{identify_bank, UNKNOWN_BANK};
pub use classify::{Categorizer, Classification, Classify, ClassifyRequest, RemoteClassifier, RuleClassifier};
pub use config::{ClassifierSettings, Config, DetectionSettings, MailboxSettings};
pub use detect::{normalize_merchant, recurring_yearly_total, SubscriptionDetector};
pub use error::{Error, Result};
pub use export::{parse_csv, to_csv, to_json, ExportFormat};
pub use fetch::{FetchOutcome, Fetcher};
pub use models::{
    BillingCycle, BodyKind, Category, ClassificationSource, EmailRecord, SubscriptionCandidate,
    Transaction,
};
pub use report::{summarize, GroupTotal, SpendingSummary, SubscriptionSplit};
pub use session::{Pipeline, RunStats, Session};
