//! Configuration loading
//!
//! Settings come from a TOML file (default: `~/.config/mailspend/config.toml`)
//! with environment-variable overrides for secrets. The classify API token is
//! read from a separate secret file named in the config; a missing token file
//! is a non-fatal condition that forces the rule-based classification path.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Environment variable holding the mailbox app password.
/// Takes precedence over the config file so the password never has to
/// be written to disk.
pub const ENV_IMAP_PASSWORD: &str = "MAILSPEND_IMAP_PASSWORD";

/// Environment variable holding the classify API token directly
/// (alternative to `classifier.token_file`).
pub const ENV_API_TOKEN: &str = "MAILSPEND_API_TOKEN";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mailbox: MailboxSettings,
    pub classifier: ClassifierSettings,
    pub detection: DetectionSettings,
}

/// Mailbox connection and search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxSettings {
    /// IMAP server hostname
    pub host: String,
    /// IMAPS port
    pub port: u16,
    /// Login email address
    pub user: String,
    /// App-specific password; prefer MAILSPEND_IMAP_PASSWORD over this
    pub password: Option<String>,
    /// Folder to search
    pub folder: String,
    /// Sender patterns for the IMAP FROM search, OR-joined.
    /// Empty means no sender restriction.
    pub sender_patterns: Vec<String>,
    /// Maximum number of messages to download per run
    pub max_emails: usize,
    /// Cap on concurrent body fetches (each worker holds its own connection)
    pub concurrency: usize,
    /// Connect/read timeout in seconds for IMAP sockets
    pub timeout_secs: u64,
}

impl Default for MailboxSettings {
    fn default() -> Self {
        Self {
            host: "imap.gmail.com".to_string(),
            port: 993,
            user: String::new(),
            password: None,
            folder: "INBOX".to_string(),
            sender_patterns: default_sender_patterns(),
            max_emails: 200,
            concurrency: 50,
            timeout_secs: 10,
        }
    }
}

/// Alert addresses the major banks send transaction mails from.
/// Users extend this list in the config file.
fn default_sender_patterns() -> Vec<String> {
    [
        "alerts.sbi.co.in",
        "alerts@hdfcbank.net",
        "alerts@icicibank.com",
        "alerts@axisbank.com",
        "bankalerts@kotak.com",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Hosted classify endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    /// Classify endpoint URL
    pub endpoint: String,
    /// Path to the file holding the API token (single line).
    /// Missing file disables the remote path.
    pub token_file: Option<PathBuf>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retries on transient failure before falling back to rules
    pub max_retries: u32,
    /// Maximum number of body characters sent to the endpoint
    pub max_excerpt_chars: usize,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.mailspend.dev/v1/classify".to_string(),
            token_file: None,
            timeout_secs: 15,
            max_retries: 2,
            max_excerpt_chars: 2000,
        }
    }
}

/// Subscription detection thresholds
///
/// The trial threshold and tolerance windows are empirically tuned, so they
/// are configuration rather than constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Gap tolerance in days around the nominal 30/90/365 cycle lengths
    pub gap_tolerance_days: i64,
    /// Amounts at or below this are treated as likely trial charges
    pub trial_amount_threshold: f64,
    /// Allowed fraction of deviation from the group's median amount
    pub amount_variance: f64,
    /// Fraction of gaps that must fall inside the tolerance window
    pub gap_consistency: f64,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            gap_tolerance_days: 5,
            trial_amount_threshold: 100.0,
            amount_variance: 0.05,
            gap_consistency: 0.7,
        }
    }
}

impl Config {
    /// Load configuration from an explicit path
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        let mut config: Config = toml::from_str(&raw)
            .map_err(|e| Error::Configuration(format!("Invalid config: {}", e)))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from the default location, falling back to defaults when the
    /// file does not exist
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                debug!("No config file found, using defaults");
                let mut config = Config::default();
                config.apply_env_overrides();
                Ok(config)
            }
        }
    }

    /// Default config file path (`~/.config/mailspend/config.toml` on Linux)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("mailspend").join("config.toml"))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(password) = std::env::var(ENV_IMAP_PASSWORD) {
            self.mailbox.password = Some(password);
        }
    }

    /// Resolve the mailbox password, erroring when none is configured
    pub fn mailbox_password(&self) -> Result<String> {
        self.mailbox.password.clone().ok_or_else(|| {
            Error::Configuration(format!(
                "No mailbox password configured (set {} or mailbox.password)",
                ENV_IMAP_PASSWORD
            ))
        })
    }

    /// Read the classify API token
    ///
    /// Returns None when no token is available; the caller degrades to the
    /// rule-based path without aborting.
    pub fn api_token(&self) -> Option<String> {
        if let Ok(token) = std::env::var(ENV_API_TOKEN) {
            let token = token.trim().to_string();
            if !token.is_empty() {
                return Some(token);
            }
        }

        let path = match &self.classifier.token_file {
            Some(p) => p.clone(),
            None => {
                warn!("No API token configured; classification runs in rules-only mode");
                return None;
            }
        };

        match std::fs::read_to_string(&path) {
            Ok(raw) => {
                let token = raw.trim().to_string();
                if token.is_empty() {
                    warn!(
                        "API token file {} is empty; falling back to rules-only mode",
                        path.display()
                    );
                    None
                } else {
                    Some(token)
                }
            }
            Err(e) => {
                warn!(
                    "Cannot read API token file {}: {}; falling back to rules-only mode",
                    path.display(),
                    e
                );
                None
            }
        }
    }
}
