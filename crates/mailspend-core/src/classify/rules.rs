//! Rule-based classification fallback
//!
//! Deterministic keyword/regex path used when the remote endpoint is
//! unavailable or fails. The amount patterns and category keyword table
//! mirror the formats the Indian bank alert mails actually use.

use async_trait::async_trait;
use regex::Regex;

use crate::error::Result;
use crate::models::Category;

use super::{Classification, Classify, ClassifyRequest};

/// Keywords per category, checked against the lowercased subject+body.
/// First matching category wins, so the more specific sets come first.
const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::AtmWithdrawal,
        &["atm", "cash withdrawal", "withdrawn at", "cash wdl"],
    ),
    (
        Category::Transfer,
        &["neft", "rtgs", "imps", "upi", "transferred", "fund transfer"],
    ),
    (
        Category::Investment,
        &["mutual fund", "sip ", "investment", "brokerage", "demat"],
    ),
    (
        Category::BillsUtilities,
        &[
            "electricity",
            "water bill",
            "gas bill",
            "broadband",
            "mobile recharge",
            "phone bill",
            "dth",
        ],
    ),
    (
        Category::FoodDining,
        &["restaurant", "dining", "cafe", "swiggy", "zomato", "food"],
    ),
    (
        Category::Transport,
        &["fuel", "petrol", "diesel", "uber", "ola", "taxi", "metro", "irctc"],
    ),
    (
        Category::Healthcare,
        &["hospital", "pharmacy", "medical", "clinic", "diagnostics"],
    ),
    (
        Category::Entertainment,
        &["netflix", "hotstar", "spotify", "prime video", "movie", "bookmyshow"],
    ),
    (
        Category::Shopping,
        &["purchase", "shopping", "store", "mart", "amazon", "flipkart", "myntra"],
    ),
    (
        Category::Payment,
        &["payment", "paid", "bill payment", "debited towards"],
    ),
];

/// Keywords indicating a recurring charge
const SUBSCRIPTION_KEYWORDS: &[&str] = &[
    "subscription",
    "auto-debit",
    "autopay",
    "auto pay",
    "renewal",
    "recurring",
    "membership",
    "e-mandate",
    "standing instruction",
];

/// Keywords indicating an introductory/trial charge
const TRIAL_KEYWORDS: &[&str] = &["trial", "introductory offer", "intro price"];

/// Deterministic keyword/regex classifier
///
/// Construction compiles the amount patterns once; classification itself
/// cannot fail.
pub struct RuleClassifier {
    /// (pattern, currency code implied by the marker)
    amount_patterns: Vec<(Regex, &'static str)>,
    merchant_patterns: Vec<Regex>,
    trial_amount_threshold: f64,
}

impl RuleClassifier {
    pub fn new(trial_amount_threshold: f64) -> Self {
        // Amount formats seen in bank alert mails, most specific first.
        // The capture group is the numeric part with optional separators.
        let amount_sources: &[(&str, &str)] = &[
            (r"(?i)Amount\s*\(INR\)\s*:?\s*(\d+(?:,\d+)*(?:\.\d{1,2})?)", "INR"),
            (r"(?i)\bRs\.?\s*(\d+(?:,\d+)*(?:\.\d{1,2})?)", "INR"),
            (r"(?i)\bINR\s*(\d+(?:,\d+)*(?:\.\d{1,2})?)", "INR"),
            (r"₹\s*(\d+(?:,\d+)*(?:\.\d{1,2})?)", "INR"),
            (r"(?i)\bUSD\s*(\d+(?:,\d+)*(?:\.\d{1,2})?)", "USD"),
            (r"\$\s*(\d+(?:,\d+)*(?:\.\d{1,2})?)", "USD"),
            (r"(?i)\bEUR\s*(\d+(?:,\d+)*(?:\.\d{1,2})?)", "EUR"),
        ];

        let amount_patterns = amount_sources
            .iter()
            .map(|(src, cur)| (Regex::new(src).expect("static amount pattern"), *cur))
            .collect();

        // Merchant phrasings: "at MERCHANT on", "to MERCHANT on", UPI VPA
        let merchant_sources = [
            r"(?i)\bat\s+([A-Z][A-Za-z0-9&.' -]{2,40}?)\s+(?:on|dated|via|ref)\b",
            r"(?i)\bto\s+(?:VPA\s+)?([A-Za-z0-9&.'@_ -]{2,40}?)\s+(?:on|dated|via|ref)\b",
            r"(?i)\btowards\s+([A-Z][A-Za-z0-9&.' -]{2,40}?)(?:\.|,|$)",
        ];
        let merchant_patterns = merchant_sources
            .iter()
            .map(|src| Regex::new(src).expect("static merchant pattern"))
            .collect();

        Self {
            amount_patterns,
            merchant_patterns,
            trial_amount_threshold,
        }
    }

    /// Classify without a Result wrapper; this path has no failure mode
    pub fn classify_infallible(&self, request: &ClassifyRequest) -> Classification {
        let text = request.text();
        let lower = text.to_lowercase();

        let (amount, currency) = self.extract_amount(&text);
        let category = categorize_by_keywords(&lower);
        let merchant = self
            .extract_merchant(&text)
            .unwrap_or_else(|| fallback_merchant(&request.subject, &request.bank));

        let has_trial_keyword = TRIAL_KEYWORDS.iter().any(|k| lower.contains(k));
        let has_subscription_keyword = SUBSCRIPTION_KEYWORDS.iter().any(|k| lower.contains(k));

        let is_trial = has_trial_keyword
            || (has_subscription_keyword && amount > 0.0 && amount <= self.trial_amount_threshold);
        let is_subscription = has_subscription_keyword || has_trial_keyword;

        // Confidence reflects how much structure the rules actually found
        let confidence = match (amount > 0.0, category != Category::Uncategorized) {
            (true, true) => 0.8,
            (true, false) | (false, true) => 0.5,
            (false, false) => 0.1,
        };

        Classification {
            merchant,
            amount,
            currency: currency.to_string(),
            category,
            is_subscription,
            is_trial,
            confidence,
        }
    }

    fn extract_amount(&self, text: &str) -> (f64, &'static str) {
        for (pattern, currency) in &self.amount_patterns {
            if let Some(caps) = pattern.captures(text) {
                let raw = caps[1].replace(',', "");
                if let Ok(value) = raw.parse::<f64>() {
                    return (value.abs(), currency);
                }
            }
        }
        (0.0, "INR")
    }

    fn extract_merchant(&self, text: &str) -> Option<String> {
        for pattern in &self.merchant_patterns {
            if let Some(caps) = pattern.captures(text) {
                let merchant = caps[1].trim().trim_end_matches(['.', ',']).trim();
                if !merchant.is_empty() {
                    return Some(merchant.to_string());
                }
            }
        }
        None
    }
}

#[async_trait]
impl Classify for RuleClassifier {
    async fn classify(&self, request: &ClassifyRequest) -> Result<Classification> {
        Ok(self.classify_infallible(request))
    }
}

/// First matching keyword set wins; Uncategorized when nothing matches
fn categorize_by_keywords(lower_text: &str) -> Category {
    for (category, keywords) in CATEGORY_KEYWORDS {
        if keywords.iter().any(|k| lower_text.contains(k)) {
            return *category;
        }
    }
    Category::Uncategorized
}

/// Last-resort merchant name when no phrasing matched: the subject with
/// alert boilerplate removed, or the bank label when even that is empty
fn fallback_merchant(subject: &str, bank: &str) -> String {
    let stripped: String = subject
        .split_whitespace()
        .filter(|word| {
            let w = word.to_lowercase();
            !matches!(w.as_str(), "alert" | "alert:" | "transaction" | "notification")
        })
        .collect::<Vec<_>>()
        .join(" ");

    if !stripped.is_empty() {
        stripped
    } else if !bank.is_empty() {
        bank.to_string()
    } else {
        "Unknown".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn request(subject: &str, body: &str) -> ClassifyRequest {
        ClassifyRequest {
            subject: subject.to_string(),
            body: body.to_string(),
            bank: "sbi".to_string(),
            date: Utc::now(),
        }
    }

    fn classifier() -> RuleClassifier {
        RuleClassifier::new(100.0)
    }

    #[test]
    fn test_amount_extraction_formats() {
        let c = classifier();
        let cases = [
            ("Rs. 2,000.00 withdrawn", 2000.0),
            ("Amount (INR) 649.00 debited", 649.0),
            ("INR 150 paid", 150.0),
            ("₹99 charged", 99.0),
            ("$12.99 charged", 12.99),
        ];
        for (body, expected) in cases {
            let result = c.classify_infallible(&request("Alert", body));
            assert_eq!(result.amount, expected, "body: {}", body);
        }
    }

    #[test]
    fn test_category_keywords() {
        let c = classifier();
        let result = c.classify_infallible(&request(
            "SBI ATM Alert",
            "Rs. 2000.00 cash withdrawal at ATM S1AW002 on 15-06-2024",
        ));
        assert_eq!(result.category, Category::AtmWithdrawal);

        let result = c.classify_infallible(&request(
            "UPI transaction",
            "Rs. 150.00 transferred via UPI to merchant@okaxis on 14-06-2024",
        ));
        assert_eq!(result.category, Category::Transfer);
    }

    #[test]
    fn test_merchant_extraction() {
        let c = classifier();
        let result = c.classify_infallible(&request(
            "Card transaction",
            "Rs. 649.00 spent at NETFLIX INDIA on 01-06-2024 via card ending 1234",
        ));
        assert_eq!(result.merchant, "NETFLIX INDIA");
    }

    #[test]
    fn test_trial_detection() {
        let c = classifier();
        let result = c.classify_infallible(&request(
            "Welcome to TrialServiceX",
            "Rs. 1.00 charged for your free trial at TRIALSERVICEX on 01-06-2024",
        ));
        assert!(result.is_trial);
        assert!(result.is_subscription);
    }

    #[test]
    fn test_subscription_keyword_without_trial() {
        let c = classifier();
        let result = c.classify_infallible(&request(
            "Auto-debit alert",
            "Rs. 649.00 auto-debit towards NETFLIX MEMBERSHIP.",
        ));
        assert!(result.is_subscription);
        // 649 is above the trial threshold
        assert!(!result.is_trial);
    }

    #[test]
    fn test_empty_text_never_panics() {
        let c = classifier();
        let result = c.classify_infallible(&request("", ""));
        assert_eq!(result.category, Category::Uncategorized);
        assert_eq!(result.amount, 0.0);
        assert!(result.confidence <= 0.2);
    }

    #[test]
    fn test_garbage_text_is_low_confidence_uncategorized() {
        let c = classifier();
        let result = c.classify_infallible(&request("\u{0}\u{1}", "���<<>>"));
        assert_eq!(result.category, Category::Uncategorized);
        assert!(result.confidence <= 0.2);
    }

    #[test]
    fn test_deterministic() {
        let c = classifier();
        let req = request("SBI Alert", "Rs. 500.00 spent at BIG BAZAAR on 01-06-2024");
        let a = c.classify_infallible(&req);
        let b = c.classify_infallible(&req);
        assert_eq!(a.merchant, b.merchant);
        assert_eq!(a.amount, b.amount);
        assert_eq!(a.category, b.category);
    }
}
