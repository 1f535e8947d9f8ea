//! Subscription detection
//!
//! Groups transactions by normalized merchant and looks for recurring
//! charge patterns:
//! - gaps between same-merchant charges clustering around 30/90/365 days
//!   (within a configurable tolerance) classify the group as
//!   Monthly/Quarterly/Yearly
//! - irregular groups are excluded entirely
//! - stable amounts are required (each within a configurable fraction of
//!   the group median)
//! - low-amount or trial-keyword charges are flagged as trials; a trial
//!   with a single occurrence becomes a candidate without a cycle and is
//!   excluded from recurring totals until it recurs
//!
//! Detection is a pure recomputation over the full list: no incremental
//! state, and running it twice over the same input yields identical output.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::config::DetectionSettings;
use crate::models::{BillingCycle, SubscriptionCandidate, Transaction};

/// Subscription detector
pub struct SubscriptionDetector {
    settings: DetectionSettings,
}

impl SubscriptionDetector {
    pub fn new(settings: DetectionSettings) -> Self {
        Self { settings }
    }

    /// Run detection over the full transaction list
    ///
    /// Output is sorted by merchant for stable ordering.
    pub fn detect(&self, transactions: &[Transaction]) -> Vec<SubscriptionCandidate> {
        let mut by_merchant: HashMap<String, Vec<&Transaction>> = HashMap::new();
        for tx in transactions {
            if tx.amount <= 0.0 {
                continue; // Nothing to learn from amount-less records
            }
            by_merchant
                .entry(normalize_merchant(&tx.merchant))
                .or_default()
                .push(tx);
        }

        let mut candidates = Vec::new();

        for (merchant, group) in by_merchant {
            if let Some(candidate) = self.evaluate_group(&merchant, &group) {
                debug!(
                    merchant = %candidate.merchant,
                    cycle = ?candidate.cycle,
                    trial = candidate.is_trial,
                    "Subscription candidate"
                );
                candidates.push(candidate);
            }
        }

        candidates.sort_by(|a, b| a.merchant.cmp(&b.merchant));
        candidates
    }

    /// Evaluate one merchant's transactions
    fn evaluate_group(
        &self,
        merchant: &str,
        group: &[&Transaction],
    ) -> Option<SubscriptionCandidate> {
        let mut sorted: Vec<&Transaction> = group.to_vec();
        sorted.sort_by_key(|t| t.date);

        let first_seen = sorted.first()?.date.date_naive();
        let last_seen = sorted.last()?.date.date_naive();
        let amounts: Vec<f64> = sorted.iter().map(|t| t.amount).collect();
        let median_amount = median(&amounts);
        let is_trial = self.group_is_trial(&sorted, median_amount);

        if sorted.len() < 2 {
            // A lone trial charge is still worth surfacing: it is presumed
            // to convert into a recurring charge. No cycle can be inferred
            // yet, which keeps it out of recurring totals.
            if is_trial {
                return Some(SubscriptionCandidate {
                    merchant: merchant.to_string(),
                    cycle: None,
                    average_amount: median_amount,
                    currency: sorted[0].currency.clone(),
                    first_seen,
                    last_seen,
                    is_trial: true,
                    occurrences: 1,
                });
            }
            return None;
        }

        // Amount stability: every charge within amount_variance of the median
        if median_amount < 0.01 {
            return None;
        }
        let amounts_stable = amounts
            .iter()
            .all(|a| (a - median_amount).abs() / median_amount <= self.settings.amount_variance);
        if !amounts_stable {
            return None;
        }

        let gaps: Vec<i64> = sorted
            .windows(2)
            .map(|w| (w[1].date.date_naive() - w[0].date.date_naive()).num_days())
            .collect();

        let cycle = self.classify_gaps(&gaps)?;

        Some(SubscriptionCandidate {
            merchant: merchant.to_string(),
            cycle: Some(cycle),
            average_amount: median_amount,
            currency: sorted[0].currency.clone(),
            first_seen,
            last_seen,
            is_trial,
            occurrences: sorted.len(),
        })
    }

    /// Match the gap list against the known cycle lengths
    ///
    /// The cycle whose nominal length is closest to the mean gap is the
    /// candidate; the group qualifies when enough gaps (gap_consistency)
    /// fall within gap_tolerance_days of that nominal length. Otherwise
    /// the group is irregular.
    fn classify_gaps(&self, gaps: &[i64]) -> Option<BillingCycle> {
        if gaps.is_empty() {
            return None;
        }

        let mean_gap = gaps.iter().sum::<i64>() as f64 / gaps.len() as f64;
        let cycle = [
            BillingCycle::Monthly,
            BillingCycle::Quarterly,
            BillingCycle::Yearly,
        ]
        .into_iter()
        .min_by_key(|c| (mean_gap - c.nominal_days() as f64).abs() as i64)?;

        let tolerance = self.settings.gap_tolerance_days;
        let nominal = cycle.nominal_days();
        let within = gaps
            .iter()
            .filter(|&&gap| (gap - nominal).abs() <= tolerance)
            .count();

        let consistent = within as f64 / gaps.len() as f64 >= self.settings.gap_consistency;
        consistent.then_some(cycle)
    }

    /// Trial when any charge carried the trial flag from classification or
    /// the typical charge sits at or below the trial threshold
    fn group_is_trial(&self, sorted: &[&Transaction], median_amount: f64) -> bool {
        sorted.iter().any(|t| t.is_trial)
            || (median_amount > 0.0 && median_amount <= self.settings.trial_amount_threshold)
    }
}

/// Sum of projected yearly costs over candidates with a known cycle
///
/// Trials without a cycle contribute nothing until they recur.
pub fn recurring_yearly_total(candidates: &[SubscriptionCandidate]) -> f64 {
    candidates.iter().map(|c| c.yearly_cost()).sum()
}

/// Normalize a merchant name for grouping
///
/// Uppercases, drops separator punctuation, and keeps the first three
/// words; bank alerts decorate merchant names with reference IDs that
/// would otherwise split groups.
pub fn normalize_merchant(merchant: &str) -> String {
    merchant
        .to_uppercase()
        .replace(['*', '#'], " ")
        .split_whitespace()
        .filter(|word| !word.chars().all(|c| c.is_ascii_digit()))
        .take(3)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Median of a slice
fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, ClassificationSource};
    use chrono::{TimeZone, Utc};

    fn tx(merchant: &str, amount: f64, date: NaiveDate, is_trial: bool) -> Transaction {
        Transaction {
            email_uid: 0,
            merchant: merchant.to_string(),
            amount,
            currency: "INR".to_string(),
            category: Category::Entertainment,
            bank: "sbi".to_string(),
            date: Utc
                .from_utc_datetime(&date.and_hms_opt(10, 0, 0).unwrap()),
            is_subscription: false,
            is_trial,
            confidence: 0.8,
            source: ClassificationSource::Rules,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn detector() -> SubscriptionDetector {
        SubscriptionDetector::new(DetectionSettings::default())
    }

    #[test]
    fn test_monthly_subscription_detected() {
        // Three charges of 649 exactly 30 days apart: Monthly, not a trial
        let transactions = vec![
            tx("Netflix", 649.0, day(2024, 1, 5), false),
            tx("Netflix", 649.0, day(2024, 2, 4), false),
            tx("Netflix", 649.0, day(2024, 3, 5), false),
        ];
        let candidates = detector().detect(&transactions);
        assert_eq!(candidates.len(), 1);
        let candidate = &candidates[0];
        assert_eq!(candidate.cycle, Some(BillingCycle::Monthly));
        assert!(!candidate.is_trial);
        assert_eq!(candidate.average_amount, 649.0);
        assert_eq!(candidate.occurrences, 3);
        assert_eq!(candidate.yearly_cost(), 649.0 * 12.0);
    }

    #[test]
    fn test_quarterly_and_yearly() {
        let quarterly = vec![
            tx("GymPro", 1500.0, day(2023, 1, 1), false),
            tx("GymPro", 1500.0, day(2023, 4, 2), false),
            tx("GymPro", 1500.0, day(2023, 7, 1), false),
        ];
        let candidates = detector().detect(&quarterly);
        assert_eq!(candidates[0].cycle, Some(BillingCycle::Quarterly));

        let yearly = vec![
            tx("DomainReg", 999.0, day(2022, 3, 10), false),
            tx("DomainReg", 999.0, day(2023, 3, 11), false),
        ];
        let candidates = detector().detect(&yearly);
        assert_eq!(candidates[0].cycle, Some(BillingCycle::Yearly));
    }

    #[test]
    fn test_irregular_group_excluded() {
        // Gaps of 12 and 47 days cluster around nothing
        let transactions = vec![
            tx("Corner Store", 500.0, day(2024, 1, 1), false),
            tx("Corner Store", 500.0, day(2024, 1, 13), false),
            tx("Corner Store", 500.0, day(2024, 2, 29), false),
        ];
        assert!(detector().detect(&transactions).is_empty());
    }

    #[test]
    fn test_unstable_amounts_excluded() {
        let transactions = vec![
            tx("Grocer", 300.0, day(2024, 1, 1), false),
            tx("Grocer", 900.0, day(2024, 1, 31), false),
            tx("Grocer", 450.0, day(2024, 3, 1), false),
        ];
        assert!(detector().detect(&transactions).is_empty());
    }

    #[test]
    fn test_single_trial_surfaced_without_cycle() {
        let transactions = vec![tx("TrialServiceX", 1.0, day(2024, 5, 1), true)];
        let candidates = detector().detect(&transactions);
        assert_eq!(candidates.len(), 1);
        let candidate = &candidates[0];
        assert!(candidate.is_trial);
        assert_eq!(candidate.cycle, None);
        assert_eq!(candidate.occurrences, 1);
        // Excluded from recurring totals until it recurs
        assert_eq!(recurring_yearly_total(&candidates), 0.0);
    }

    #[test]
    fn test_single_non_trial_ignored() {
        let transactions = vec![tx("One Off Shop", 2500.0, day(2024, 5, 1), false)];
        assert!(detector().detect(&transactions).is_empty());
    }

    #[test]
    fn test_low_amount_group_flagged_trial() {
        let transactions = vec![
            tx("CheapSub", 49.0, day(2024, 1, 1), false),
            tx("CheapSub", 49.0, day(2024, 1, 31), false),
            tx("CheapSub", 49.0, day(2024, 3, 1), false),
        ];
        let candidates = detector().detect(&transactions);
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].is_trial);
        assert_eq!(candidates[0].cycle, Some(BillingCycle::Monthly));
    }

    #[test]
    fn test_idempotent() {
        let transactions = vec![
            tx("Netflix", 649.0, day(2024, 1, 5), false),
            tx("Netflix", 649.0, day(2024, 2, 4), false),
            tx("Netflix", 649.0, day(2024, 3, 5), false),
            tx("Spotify*IN", 119.0, day(2024, 1, 10), false),
            tx("SPOTIFY *IN 12345", 119.0, day(2024, 2, 9), false),
        ];
        let d = detector();
        let first = d.detect(&transactions);
        let second = d.detect(&transactions);
        assert_eq!(first, second);
    }

    #[test]
    fn test_merchant_normalization_groups_variants() {
        assert_eq!(normalize_merchant("SPOTIFY *IN 12345"), "SPOTIFY IN");
        assert_eq!(normalize_merchant("Spotify*IN"), "SPOTIFY IN");
        assert_eq!(normalize_merchant("netflix.com"), "NETFLIX.COM");
    }

    #[test]
    fn test_tolerance_window_respected() {
        // 36-day gaps are outside the default ±5 window around 30...
        let wide = vec![
            tx("WideGap", 200.0, day(2024, 1, 1), false),
            tx("WideGap", 200.0, day(2024, 2, 6), false),
            tx("WideGap", 200.0, day(2024, 3, 13), false),
        ];
        assert!(detector().detect(&wide).is_empty());

        // ...but a larger configured tolerance accepts them
        let settings = DetectionSettings {
            gap_tolerance_days: 10,
            ..DetectionSettings::default()
        };
        let relaxed = SubscriptionDetector::new(settings);
        assert_eq!(relaxed.detect(&wide).len(), 1);
    }
}
