//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Mailspend - Spending insights from bank alert emails
#[derive(Parser)]
#[command(name = "mailspend")]
#[command(about = "Analyze bank transaction emails for spending and subscriptions", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to ~/.config/mailspend/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch and analyze mailbox, then print a run summary
    Analyze {
        /// Only consider emails on or after this date (YYYY-MM-DD)
        #[arg(long)]
        since: Option<String>,

        /// Only consider emails before this date (YYYY-MM-DD)
        #[arg(long)]
        before: Option<String>,
    },

    /// Fetch, analyze, and print the spending report
    Report {
        /// Period: this-month, last-month, this-year, last-30-days, last-90-days, all
        #[arg(short, long, default_value = "last-90-days")]
        period: String,
    },

    /// Fetch, analyze, and list detected subscriptions
    Subscriptions {
        /// Period to analyze (see 'report --help' for values)
        #[arg(short, long, default_value = "last-12-months")]
        period: String,
    },

    /// Fetch, analyze, and export transactions
    Export {
        /// Export format: csv or json
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Output file (stdout if not given)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Period to analyze (see 'report --help' for values)
        #[arg(short, long, default_value = "last-90-days")]
        period: String,
    },

    /// Start the web dashboard server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}
