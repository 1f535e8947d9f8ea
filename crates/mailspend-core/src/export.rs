//! Export functionality for transactions
//!
//! CSV column order is fixed (date, bank, merchant, amount, category,
//! subscription, trial) because the dashboard's download button and the
//! re-import check both depend on it. JSON export is the transaction list
//! as-is. Nothing is persisted server-side; exports go straight to the
//! caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Category, Transaction};

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown export format: {} (use csv or json)", s)),
        }
    }
}

/// One CSV row; field order defines the column order
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    date: String,
    bank: String,
    merchant: String,
    amount: f64,
    category: String,
    subscription: bool,
    trial: bool,
}

/// A (merchant, amount, category) tuple parsed back out of a CSV export,
/// used for round-trip verification
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCsvTransaction {
    pub date: DateTime<Utc>,
    pub bank: String,
    pub merchant: String,
    pub amount: f64,
    pub category: Category,
    pub subscription: bool,
    pub trial: bool,
}

/// Export transactions to CSV
pub fn to_csv(transactions: &[Transaction]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    for tx in transactions {
        writer.serialize(CsvRow {
            date: tx.date.to_rfc3339(),
            bank: tx.bank.clone(),
            merchant: tx.merchant.clone(),
            amount: tx.amount,
            category: tx.category.as_str().to_string(),
            subscription: tx.is_subscription,
            trial: tx.is_trial,
        })?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::InvalidData(format!("CSV flush failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| Error::InvalidData(format!("CSV not UTF-8: {}", e)))
}

/// Export transactions to pretty-printed JSON
pub fn to_json(transactions: &[Transaction]) -> Result<String> {
    Ok(serde_json::to_string_pretty(transactions)?)
}

/// Parse a CSV export back into transaction tuples
///
/// Used by the round-trip check: exporting then parsing yields the same
/// (merchant, amount, category) set, ignoring formatting.
pub fn parse_csv(data: &str) -> Result<Vec<ParsedCsvTransaction>> {
    let mut reader = csv::Reader::from_reader(data.as_bytes());
    let mut parsed = Vec::new();

    for row in reader.deserialize::<CsvRow>() {
        let row = row?;
        let date = DateTime::parse_from_rfc3339(&row.date)
            .map_err(|e| Error::InvalidData(format!("Bad date in CSV: {}", e)))?
            .with_timezone(&Utc);
        let category = row
            .category
            .parse::<Category>()
            .map_err(Error::InvalidData)?;

        parsed.push(ParsedCsvTransaction {
            date,
            bank: row.bank,
            merchant: row.merchant,
            amount: row.amount,
            category,
            subscription: row.subscription,
            trial: row.trial,
        });
    }

    Ok(parsed)
}
