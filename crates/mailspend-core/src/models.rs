//! Domain models for Mailspend

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// How the body of a fetched message was encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    Plain,
    Html,
}

/// A raw email fetched from the mailbox
///
/// Immutable once produced by the fetcher; discarded when the session ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailRecord {
    /// IMAP UID within the selected folder
    pub uid: u32,
    pub sender: String,
    pub subject: String,
    pub date: DateTime<Utc>,
    /// Body text; already stripped to plain text when the source was HTML
    pub body: String,
    pub body_kind: BodyKind,
}

/// Fixed category set for classified transactions
///
/// Both classification paths (remote and rules) must produce a value from
/// this set so downstream stages are agnostic to which path ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    AtmWithdrawal,
    Transfer,
    Payment,
    Shopping,
    FoodDining,
    BillsUtilities,
    Entertainment,
    Transport,
    Healthcare,
    Investment,
    #[default]
    Uncategorized,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AtmWithdrawal => "atm_withdrawal",
            Self::Transfer => "transfer",
            Self::Payment => "payment",
            Self::Shopping => "shopping",
            Self::FoodDining => "food_dining",
            Self::BillsUtilities => "bills_utilities",
            Self::Entertainment => "entertainment",
            Self::Transport => "transport",
            Self::Healthcare => "healthcare",
            Self::Investment => "investment",
            Self::Uncategorized => "uncategorized",
        }
    }

    /// All categories, in display order
    pub fn all() -> &'static [Category] {
        &[
            Self::AtmWithdrawal,
            Self::Transfer,
            Self::Payment,
            Self::Shopping,
            Self::FoodDining,
            Self::BillsUtilities,
            Self::Entertainment,
            Self::Transport,
            Self::Healthcare,
            Self::Investment,
            Self::Uncategorized,
        ]
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '&', '-'], "_");
        match normalized.as_str() {
            "atm_withdrawal" | "atm" | "withdrawal" => Ok(Self::AtmWithdrawal),
            "transfer" => Ok(Self::Transfer),
            "payment" => Ok(Self::Payment),
            "shopping" => Ok(Self::Shopping),
            "food_dining" | "food___dining" | "food__dining" | "food" | "dining" => {
                Ok(Self::FoodDining)
            }
            "bills_utilities" | "bills___utilities" | "bills__utilities" | "bills"
            | "utilities" => Ok(Self::BillsUtilities),
            "entertainment" => Ok(Self::Entertainment),
            "transport" | "travel" => Ok(Self::Transport),
            "healthcare" | "health" | "medical" => Ok(Self::Healthcare),
            "investment" | "investments" => Ok(Self::Investment),
            "uncategorized" | "other" | "" => Ok(Self::Uncategorized),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which classification path produced a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationSource {
    /// Hosted model endpoint
    Remote,
    /// Deterministic keyword/regex fallback
    #[default]
    Rules,
}

impl ClassificationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Rules => "rules",
        }
    }
}

/// A classified bank transaction
///
/// Derived from exactly one [`EmailRecord`]; lives only in the session's
/// in-memory list and is never persisted to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// UID of the email this transaction was derived from
    pub email_uid: u32,
    pub merchant: String,
    /// Always non-negative; the alert mails report magnitudes, not signs
    pub amount: f64,
    pub currency: String,
    pub category: Category,
    /// Bank label from the identifier, or "unknown"
    pub bank: String,
    pub date: DateTime<Utc>,
    pub is_subscription: bool,
    pub is_trial: bool,
    /// Classifier confidence in 0.0..=1.0
    pub confidence: f64,
    pub source: ClassificationSource,
}

/// Inferred recurrence period for a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Quarterly,
    Yearly,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }

    /// Nominal gap in days between charges
    pub fn nominal_days(&self) -> i64 {
        match self {
            Self::Monthly => 30,
            Self::Quarterly => 90,
            Self::Yearly => 365,
        }
    }

    /// Charges per year, for cost projection
    pub fn charges_per_year(&self) -> f64 {
        match self {
            Self::Monthly => 12.0,
            Self::Quarterly => 4.0,
            Self::Yearly => 1.0,
        }
    }
}

impl std::fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A merchant flagged by the subscription detector
///
/// Recomputed in full on every detection run; there is no incremental state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionCandidate {
    pub merchant: String,
    /// None for single-occurrence trials where no cycle can be inferred yet;
    /// such candidates are excluded from recurring totals
    pub cycle: Option<BillingCycle>,
    pub average_amount: f64,
    pub currency: String,
    pub first_seen: NaiveDate,
    pub last_seen: NaiveDate,
    pub is_trial: bool,
    pub occurrences: usize,
}

impl SubscriptionCandidate {
    /// Projected yearly cost, zero when no cycle is known yet
    pub fn yearly_cost(&self) -> f64 {
        match self.cycle {
            Some(cycle) => self.average_amount * cycle.charges_per_year(),
            None => 0.0,
        }
    }
}
