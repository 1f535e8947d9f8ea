//! Export command implementation

use std::path::Path;

use anyhow::{Context, Result};
use mailspend_core::{to_csv, to_json, ExportFormat};

use super::{resolve_period, run_pipeline};

pub async fn cmd_export(
    config_path: Option<&Path>,
    format: &str,
    output: Option<&Path>,
    period: &str,
) -> Result<()> {
    let format: ExportFormat = format.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let (since, before) = resolve_period(period)?;

    eprintln!("📬 Fetching bank alert emails...");
    let session = run_pipeline(config_path, since, before).await?;

    let rendered = match format {
        ExportFormat::Csv => to_csv(&session.transactions)?,
        ExportFormat::Json => to_json(&session.transactions)?,
    };

    match output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "✅ Exported {} transactions to {}",
                session.transactions.len(),
                path.display()
            );
        }
        None => print!("{}", rendered),
    }

    Ok(())
}
