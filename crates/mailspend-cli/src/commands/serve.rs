//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};

use super::load_config;

pub async fn cmd_serve(config_path: Option<&Path>, host: &str, port: u16) -> Result<()> {
    let config = load_config(config_path)?;

    println!("🚀 Starting Mailspend dashboard server...");
    println!("   Mailbox:   {}@{}", config.mailbox.user, config.mailbox.host);
    println!("   Listening: http://{}:{}", host, port);
    println!();
    println!("   The session starts empty; POST /api/session/refresh runs the");
    println!("   mailbox analysis and populates it.");

    let addr = format!("{}:{}", host, port);
    mailspend_server::serve(config, &addr)
        .await
        .context("Server failed")
}
