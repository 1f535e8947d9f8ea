//! Report command implementation

use std::path::Path;

use anyhow::Result;

use super::{resolve_period, run_pipeline, truncate};

pub async fn cmd_report(config_path: Option<&Path>, period: &str) -> Result<()> {
    let (since, before) = resolve_period(period)?;

    println!("📬 Fetching bank alert emails...");
    let session = run_pipeline(config_path, since, before).await?;
    let summary = &session.summary;

    println!();
    println!("💰 Spending Report ({})", period);
    println!("   ─────────────────────────────────────────");
    println!(
        "   {} transactions, total {:.2} (avg {:.2})",
        summary.transaction_count, summary.total_amount, summary.average_amount
    );

    if !summary.by_category.is_empty() {
        println!();
        println!("   By category:");
        for group in &summary.by_category {
            println!(
                "   {:20} │ {:>12.2} │ {:>4} txns",
                truncate(&group.key, 20),
                group.total,
                group.count
            );
        }
    }

    if !summary.by_bank.is_empty() {
        println!();
        println!("   By bank:");
        for group in &summary.by_bank {
            println!(
                "   {:20} │ {:>12.2} │ {:>4} txns",
                truncate(&group.key, 20),
                group.total,
                group.count
            );
        }
    }

    if !summary.by_month.is_empty() {
        println!();
        println!("   By month:");
        for group in &summary.by_month {
            println!("   {:7} │ {:>12.2} │ {:>4} txns", group.key, group.total, group.count);
        }
    }

    println!();
    println!(
        "   Subscriptions: {:.2} across {} charges │ One-time: {:.2} across {} charges",
        summary.split.subscription_total,
        summary.split.subscription_count,
        summary.split.one_time_total,
        summary.split.one_time_count
    );

    Ok(())
}
