//! Shared command utilities: config loading, pipeline runs, period parsing

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Utc};
use mailspend_core::{Config, Pipeline, Session};

/// Load configuration from an explicit path or the default location
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => Config::load(p)
            .with_context(|| format!("Failed to load config from {}", p.display())),
        None => Config::load_default().context("Failed to load config"),
    }
}

/// Run the full fetch-to-summary pipeline for a date range
pub async fn run_pipeline(
    config_path: Option<&Path>,
    since: Option<NaiveDate>,
    before: Option<NaiveDate>,
) -> Result<Session> {
    let config = load_config(config_path)?;
    let pipeline = Pipeline::new(config);

    if !pipeline.has_remote_classifier() {
        println!("ℹ️  No classify API token configured - using rule-based classification");
    }

    pipeline
        .run(since, before)
        .await
        .context("Analysis pipeline failed")
}

/// Parse a YYYY-MM-DD date argument
pub fn parse_date(value: &str, flag: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid {} date format (use YYYY-MM-DD)", flag))
}

/// Resolve a period string to (since, before) for the mailbox search
///
/// `since` is inclusive and `before` exclusive, matching IMAP SEARCH
/// semantics; `before` is None for periods that run up to today.
pub fn resolve_period(period: &str) -> Result<(Option<NaiveDate>, Option<NaiveDate>)> {
    let today = Utc::now().date_naive();

    match period.to_lowercase().as_str() {
        "this-month" => {
            let from = NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap();
            Ok((Some(from), None))
        }
        "last-month" => {
            let this_month_start = NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap();
            let from = if today.month() == 1 {
                NaiveDate::from_ymd_opt(today.year() - 1, 12, 1).unwrap()
            } else {
                NaiveDate::from_ymd_opt(today.year(), today.month() - 1, 1).unwrap()
            };
            Ok((Some(from), Some(this_month_start)))
        }
        "this-year" => {
            let from = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap();
            Ok((Some(from), None))
        }
        "last-30-days" => Ok((Some(today - chrono::Duration::days(30)), None)),
        "last-90-days" => Ok((Some(today - chrono::Duration::days(90)), None)),
        "last-12-months" => Ok((Some(today - chrono::Duration::days(365)), None)),
        "all" => Ok((None, None)),
        _ => anyhow::bail!(
            "Unknown period: {}. Available: this-month, last-month, this-year, last-30-days, last-90-days, last-12-months, all",
            period
        ),
    }
}
