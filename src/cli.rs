use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::pypistats::DEFAULT_API_URL;

const CREDENTIAL_FILE_NAME: &str = "slack_webhook_url";
const LOG_FILE: &str = "logs/pypi.log";

/// Post PyPI download stats for the given packages to a Slack webhook.
#[derive(Debug, Parser)]
#[command(name = "pypistats-notify", version, about)]
pub struct Cli {
    /// Space separated list of packages to query
    pub packages: Vec<String>,

    /// Webhook URL
    #[arg(short = 'w', long = "webhook_url", visible_alias = "webhook-url", value_name = "URL")]
    pub webhook_url: Option<String>,

    /// File caching the webhook URL [default: slack_webhook_url next to the executable]
    #[arg(long, value_name = "PATH")]
    pub credential_file: Option<PathBuf>,

    /// Log file [default: logs/pypi.log next to the executable]
    #[arg(long, value_name = "PATH", conflicts_with = "no_log")]
    pub log_file: Option<PathBuf>,

    /// Disable file and console logging
    #[arg(long)]
    pub no_log: bool,

    /// Base URL of the pypistats API
    #[arg(long, env = "PYPISTATS_API_URL", default_value = DEFAULT_API_URL, value_name = "URL")]
    pub stats_api: String,
}

impl Cli {
    pub fn credential_path(&self) -> Result<PathBuf> {
        match &self.credential_file {
            Some(path) => Ok(path.clone()),
            None => Ok(program_dir()?.join(CREDENTIAL_FILE_NAME)),
        }
    }

    /// `None` when logging is turned off.
    pub fn log_path(&self) -> Result<Option<PathBuf>> {
        if self.no_log {
            return Ok(None);
        }
        match &self.log_file {
            Some(path) => Ok(Some(path.clone())),
            None => Ok(Some(program_dir()?.join(LOG_FILE))),
        }
    }
}

/// Directory holding the running executable, with symlinks resolved.
fn program_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to locate the running executable")?;
    let exe = exe.canonicalize().unwrap_or(exe);
    exe.parent()
        .map(|p| p.to_path_buf())
        .ok_or_else(|| anyhow::anyhow!("Executable path has no parent: {}", exe.display()))
}
