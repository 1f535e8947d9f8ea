//! CLI command tests
//!
//! This module contains tests for the CLI argument plumbing and the shared
//! command utilities. Pipeline runs need a live mailbox and are covered by
//! the core crate's tests instead.

use chrono::{Datelike, Utc};

use crate::commands::{load_config, parse_date, resolve_period, truncate};

// ========== Period Parsing Tests ==========

#[test]
fn test_resolve_period_this_month() {
    let (since, before) = resolve_period("this-month").unwrap();
    let since = since.unwrap();
    assert_eq!(since.day(), 1);
    assert_eq!(since.month(), Utc::now().date_naive().month());
    assert!(before.is_none());
}

#[test]
fn test_resolve_period_last_month_is_bounded() {
    let (since, before) = resolve_period("last-month").unwrap();
    let since = since.unwrap();
    let before = before.unwrap();
    assert_eq!(since.day(), 1);
    assert_eq!(before.day(), 1);
    assert!(since < before);
}

#[test]
fn test_resolve_period_all_is_unbounded() {
    let (since, before) = resolve_period("all").unwrap();
    assert!(since.is_none());
    assert!(before.is_none());
}

#[test]
fn test_resolve_period_rolling_windows() {
    let today = Utc::now().date_naive();
    let (since, _) = resolve_period("last-30-days").unwrap();
    assert_eq!(since.unwrap(), today - chrono::Duration::days(30));

    let (since, _) = resolve_period("last-90-days").unwrap();
    assert_eq!(since.unwrap(), today - chrono::Duration::days(90));
}

#[test]
fn test_resolve_period_unknown() {
    let result = resolve_period("fortnight");
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Unknown period"));
}

#[test]
fn test_resolve_period_case_insensitive() {
    assert!(resolve_period("This-Month").is_ok());
}

// ========== Date Parsing Tests ==========

#[test]
fn test_parse_date_valid() {
    let date = parse_date("2024-06-15", "--since").unwrap();
    assert_eq!(date.year(), 2024);
    assert_eq!(date.month(), 6);
    assert_eq!(date.day(), 15);
}

#[test]
fn test_parse_date_invalid_mentions_flag() {
    let err = parse_date("15/06/2024", "--since").unwrap_err();
    assert!(err.to_string().contains("--since"));
}

// ========== Config Loading Tests ==========

#[test]
fn test_load_config_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[mailbox]
user = "me@example.com"
max_emails = 25
"#,
    )
    .unwrap();

    let config = load_config(Some(&path)).unwrap();
    assert_eq!(config.mailbox.user, "me@example.com");
    assert_eq!(config.mailbox.max_emails, 25);
}

#[test]
fn test_load_config_missing_explicit_path_fails() {
    let result = load_config(Some(std::path::Path::new("/nonexistent/config.toml")));
    assert!(result.is_err());
}

// ========== Formatting Tests ==========

#[test]
fn test_truncate_short_string() {
    assert_eq!(truncate("Netflix", 20), "Netflix");
}

#[test]
fn test_truncate_long_string() {
    let result = truncate("A very long merchant name indeed", 10);
    assert_eq!(result.chars().count(), 10);
    assert!(result.ends_with("..."));
}

#[test]
fn test_truncate_multibyte_merchant() {
    // Devanagari merchant names are multi-byte per char; truncation must
    // not land inside a char boundary
    let result = truncate("कखगघङचछजझञ", 10);
    assert_eq!(result, "कखगघङचछजझञ");

    let result = truncate("कखगघङचछजझञकखगघ", 10);
    assert_eq!(result.chars().count(), 10);
    assert!(result.ends_with("..."));
    assert!(result.starts_with("कखगघङचछ"));
}
