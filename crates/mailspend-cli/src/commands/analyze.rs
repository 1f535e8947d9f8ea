//! Analyze command implementation

use std::path::Path;

use anyhow::Result;

use super::{parse_date, run_pipeline};

pub async fn cmd_analyze(
    config_path: Option<&Path>,
    since: Option<&str>,
    before: Option<&str>,
) -> Result<()> {
    let since = since.map(|s| parse_date(s, "--since")).transpose()?;
    let before = before.map(|s| parse_date(s, "--before")).transpose()?;

    println!("📬 Fetching bank alert emails...");
    let session = run_pipeline(config_path, since, before).await?;

    println!();
    println!("✅ Analysis complete");
    println!("   ─────────────────────────────────────────");
    println!("   Emails fetched:        {:>6}", session.stats.emails_fetched);
    if session.stats.emails_skipped > 0 {
        println!("   Emails skipped:        {:>6}", session.stats.emails_skipped);
    }
    println!("   Transactions:          {:>6}", session.transactions.len());
    println!("   Classified remotely:   {:>6}", session.stats.classified_remote);
    println!("   Classified by rules:   {:>6}", session.stats.classified_rules);
    println!("   Subscriptions found:   {:>6}", session.stats.subscriptions_found);
    println!();
    println!(
        "   Total spending: {:.2} across {} transactions",
        session.summary.total_amount, session.summary.transaction_count
    );
    if session.summary.yearly_recurring_cost > 0.0 {
        println!(
            "   Recurring cost: {:.2}/month ({:.2}/year)",
            session.summary.monthly_recurring_cost, session.summary.yearly_recurring_cost
        );
    }
    if session.summary.pending_trials > 0 {
        println!(
            "   ⚠️  {} free trial(s) that may convert to paid",
            session.summary.pending_trials
        );
    }

    Ok(())
}
