//! Summary aggregation
//!
//! Pure functions over the session's transaction and candidate lists that
//! produce the tables the dashboard and CLI render: totals by category, by
//! bank, by month, the subscription/one-time split, and recurring-cost
//! projections. No side effects.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::detect::recurring_yearly_total;
use crate::models::{SubscriptionCandidate, Transaction};

/// One row of a grouped total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupTotal {
    pub key: String,
    pub total: f64,
    pub count: usize,
}

/// Subscription vs one-time split
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionSplit {
    pub subscription_total: f64,
    pub subscription_count: usize,
    pub one_time_total: f64,
    pub one_time_count: usize,
}

/// Aggregate summary for one session run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpendingSummary {
    pub transaction_count: usize,
    pub total_amount: f64,
    pub average_amount: f64,
    /// Totals by category, descending by total
    pub by_category: Vec<GroupTotal>,
    /// Totals by bank label, descending by total
    pub by_bank: Vec<GroupTotal>,
    /// Totals by month (`YYYY-MM`), ascending by month
    pub by_month: Vec<GroupTotal>,
    pub split: SubscriptionSplit,
    /// Monthly-equivalent cost of all recurring candidates
    pub monthly_recurring_cost: f64,
    /// Projected yearly cost of all recurring candidates
    pub yearly_recurring_cost: f64,
    /// Candidates currently in a trial with no inferred cycle yet
    pub pending_trials: usize,
}

/// Build the full summary for a session run
pub fn summarize(
    transactions: &[Transaction],
    candidates: &[SubscriptionCandidate],
) -> SpendingSummary {
    let transaction_count = transactions.len();
    let total_amount: f64 = transactions.iter().map(|t| t.amount).sum();
    let average_amount = if transaction_count > 0 {
        total_amount / transaction_count as f64
    } else {
        0.0
    };

    let yearly = recurring_yearly_total(candidates);

    SpendingSummary {
        transaction_count,
        total_amount,
        average_amount,
        by_category: group_totals(transactions, |t| t.category.as_str().to_string()),
        by_bank: group_totals(transactions, |t| t.bank.clone()),
        by_month: monthly_totals(transactions),
        split: subscription_split(transactions),
        monthly_recurring_cost: yearly / 12.0,
        yearly_recurring_cost: yearly,
        pending_trials: candidates
            .iter()
            .filter(|c| c.is_trial && c.cycle.is_none())
            .count(),
    }
}

/// Totals grouped by an arbitrary key, descending by total
pub fn group_totals<F>(transactions: &[Transaction], key_fn: F) -> Vec<GroupTotal>
where
    F: Fn(&Transaction) -> String,
{
    let mut groups: HashMap<String, (f64, usize)> = HashMap::new();
    for tx in transactions {
        let entry = groups.entry(key_fn(tx)).or_insert((0.0, 0));
        entry.0 += tx.amount;
        entry.1 += 1;
    }

    let mut totals: Vec<GroupTotal> = groups
        .into_iter()
        .map(|(key, (total, count))| GroupTotal { key, total, count })
        .collect();
    totals.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.key.cmp(&b.key))
    });
    totals
}

/// Totals per `YYYY-MM` bucket, ascending by month
pub fn monthly_totals(transactions: &[Transaction]) -> Vec<GroupTotal> {
    let mut totals = group_totals(transactions, |t| t.date.format("%Y-%m").to_string());
    totals.sort_by(|a, b| a.key.cmp(&b.key));
    totals
}

/// Split spending into subscription-flagged vs one-time
pub fn subscription_split(transactions: &[Transaction]) -> SubscriptionSplit {
    let mut split = SubscriptionSplit::default();
    for tx in transactions {
        if tx.is_subscription {
            split.subscription_total += tx.amount;
            split.subscription_count += 1;
        } else {
            split.one_time_total += tx.amount;
            split.one_time_count += 1;
        }
    }
    split
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BillingCycle, Category, ClassificationSource};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn tx(
        merchant: &str,
        amount: f64,
        category: Category,
        bank: &str,
        date: (i32, u32, u32),
        is_subscription: bool,
    ) -> Transaction {
        Transaction {
            email_uid: 0,
            merchant: merchant.to_string(),
            amount,
            currency: "INR".to_string(),
            category,
            bank: bank.to_string(),
            date: Utc
                .from_utc_datetime(
                    &NaiveDate::from_ymd_opt(date.0, date.1, date.2)
                        .unwrap()
                        .and_hms_opt(9, 0, 0)
                        .unwrap(),
                ),
            is_subscription,
            is_trial: false,
            confidence: 0.8,
            source: ClassificationSource::Rules,
        }
    }

    fn sample() -> Vec<Transaction> {
        vec![
            tx("Netflix", 649.0, Category::Entertainment, "sbi", (2024, 1, 5), true),
            tx("Netflix", 649.0, Category::Entertainment, "sbi", (2024, 2, 4), true),
            tx("Big Bazaar", 1200.0, Category::Shopping, "hdfc", (2024, 1, 20), false),
            tx("ATM", 2000.0, Category::AtmWithdrawal, "sbi", (2024, 2, 10), false),
        ]
    }

    #[test]
    fn test_summary_totals() {
        let summary = summarize(&sample(), &[]);
        assert_eq!(summary.transaction_count, 4);
        assert_eq!(summary.total_amount, 4498.0);
        assert!((summary.average_amount - 1124.5).abs() < 1e-9);
    }

    #[test]
    fn test_by_category_descending() {
        let summary = summarize(&sample(), &[]);
        assert_eq!(summary.by_category[0].key, "atm_withdrawal");
        assert_eq!(summary.by_category[0].total, 2000.0);
        let entertainment = summary
            .by_category
            .iter()
            .find(|g| g.key == "entertainment")
            .unwrap();
        assert_eq!(entertainment.total, 1298.0);
        assert_eq!(entertainment.count, 2);
    }

    #[test]
    fn test_by_bank() {
        let summary = summarize(&sample(), &[]);
        let sbi = summary.by_bank.iter().find(|g| g.key == "sbi").unwrap();
        assert_eq!(sbi.count, 3);
        assert_eq!(sbi.total, 649.0 + 649.0 + 2000.0);
    }

    #[test]
    fn test_monthly_buckets_ascending() {
        let summary = summarize(&sample(), &[]);
        let months: Vec<&str> = summary.by_month.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(months, vec!["2024-01", "2024-02"]);
        assert_eq!(summary.by_month[0].total, 649.0 + 1200.0);
    }

    #[test]
    fn test_subscription_split() {
        let summary = summarize(&sample(), &[]);
        assert_eq!(summary.split.subscription_count, 2);
        assert_eq!(summary.split.subscription_total, 1298.0);
        assert_eq!(summary.split.one_time_count, 2);
        assert_eq!(summary.split.one_time_total, 3200.0);
    }

    #[test]
    fn test_recurring_projection() {
        let candidates = vec![
            SubscriptionCandidate {
                merchant: "NETFLIX".to_string(),
                cycle: Some(BillingCycle::Monthly),
                average_amount: 649.0,
                currency: "INR".to_string(),
                first_seen: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                last_seen: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
                is_trial: false,
                occurrences: 3,
            },
            // Trial without a cycle contributes nothing
            SubscriptionCandidate {
                merchant: "TRIALSERVICEX".to_string(),
                cycle: None,
                average_amount: 1.0,
                currency: "INR".to_string(),
                first_seen: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                last_seen: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                is_trial: true,
                occurrences: 1,
            },
        ];
        let summary = summarize(&[], &candidates);
        assert_eq!(summary.yearly_recurring_cost, 649.0 * 12.0);
        assert_eq!(summary.monthly_recurring_cost, 649.0);
        assert_eq!(summary.pending_trials, 1);
    }

    #[test]
    fn test_empty_input() {
        let summary = summarize(&[], &[]);
        assert_eq!(summary.transaction_count, 0);
        assert_eq!(summary.average_amount, 0.0);
        assert!(summary.by_category.is_empty());
    }
}
