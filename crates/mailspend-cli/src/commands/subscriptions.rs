//! Subscription command implementation

use std::path::Path;

use anyhow::Result;

use super::{resolve_period, run_pipeline, truncate};

pub async fn cmd_subscriptions(config_path: Option<&Path>, period: &str) -> Result<()> {
    let (since, before) = resolve_period(period)?;

    println!("📬 Fetching bank alert emails...");
    let session = run_pipeline(config_path, since, before).await?;

    if session.subscriptions.is_empty() {
        println!();
        println!("No recurring charges detected in this period.");
        return Ok(());
    }

    println!();
    println!("📋 Detected Subscriptions");
    println!("   ─────────────────────────────────────────────────────────────");

    for sub in &session.subscriptions {
        let status_icon = if sub.is_trial { "🆓" } else { "✅" };
        let cycle_str = sub
            .cycle
            .map(|c| c.as_str())
            .unwrap_or("trial");

        println!(
            "   {} {:20} │ {:>10.2}/{:<9} │ {:>2}x │ since {}",
            status_icon,
            truncate(&sub.merchant, 20),
            sub.average_amount,
            cycle_str,
            sub.occurrences,
            sub.first_seen
        );
    }

    println!();
    println!(
        "   Projected recurring cost: {:.2}/month ({:.2}/year)",
        session.summary.monthly_recurring_cost, session.summary.yearly_recurring_cost
    );
    if session.summary.pending_trials > 0 {
        println!(
            "   ⚠️  {} free trial(s) not counted above - cancel before they convert",
            session.summary.pending_trials
        );
    }

    Ok(())
}
