//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (config loading, pipeline runs, period parsing)
//! - `analyze` - Full pipeline run with a run-stats summary
//! - `reports` - Spending report rendering
//! - `subscriptions` - Detected subscription listing
//! - `export` - CSV/JSON transaction export
//! - `serve` - Web dashboard server command

pub mod analyze;
pub mod core;
pub mod export;
pub mod reports;
pub mod serve;
pub mod subscriptions;

// Re-export command functions for main.rs
pub use analyze::*;
pub use core::*;
pub use export::*;
pub use reports::*;
pub use serve::*;
pub use subscriptions::*;

/// Truncate a string to a maximum number of chars, adding "..." if truncated
///
/// Counts chars, not bytes; merchant names come straight from email bodies
/// and are not guaranteed to be ASCII.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
