//! Mailspend CLI - Spending insights from bank alert emails
//!
//! Usage:
//!   mailspend analyze                 Fetch mailbox and print a run summary
//!   mailspend report --period this-month
//!   mailspend subscriptions           List detected recurring charges
//!   mailspend export --format csv --output tx.csv
//!   mailspend serve --port 3000       Start the dashboard server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Analyze { since, before } => {
            commands::cmd_analyze(cli.config.as_deref(), since.as_deref(), before.as_deref()).await
        }
        Commands::Report { period } => commands::cmd_report(cli.config.as_deref(), &period).await,
        Commands::Subscriptions { period } => {
            commands::cmd_subscriptions(cli.config.as_deref(), &period).await
        }
        Commands::Export {
            format,
            output,
            period,
        } => commands::cmd_export(cli.config.as_deref(), &format, output.as_deref(), &period).await,
        Commands::Serve { port, host } => {
            commands::cmd_serve(cli.config.as_deref(), &host, port).await
        }
    }
}
