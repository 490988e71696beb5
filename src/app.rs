use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::credential::{CredentialSource, Prompt};
use crate::message::NotificationMessage;
use crate::pypistats::PypiStatsClient;
use crate::slack::SlackNotifier;

/// Everything a run needs, already pulled out of the command line.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub packages: Vec<String>,
    pub webhook_flag: Option<String>,
    pub credential_path: PathBuf,
    pub stats_api: String,
}

/// Resolves the webhook, then fetches and posts stats for each package in order.
/// The first failure stops the run.
pub async fn run<P>(config: RunConfig, mut prompt: P) -> Result<()>
where
    P: Prompt + Send + 'static,
{
    let source = CredentialSource::select(config.webhook_flag, config.credential_path);

    // The prompt blocks on stdin; keep it off the async workers.
    let webhook_url = tokio::task::spawn_blocking(move || source.resolve(&mut prompt))
        .await
        .context("Credential prompt task failed")??;

    let stats_client = PypiStatsClient::new(&config.stats_api)?;
    let notifier = SlackNotifier::new(webhook_url);

    for package in &config.packages {
        notify_package(&stats_client, &notifier, package).await?;
    }

    Ok(())
}

async fn notify_package(
    stats_client: &PypiStatsClient,
    notifier: &SlackNotifier,
    package: &str,
) -> Result<()> {
    let stats = stats_client.fetch(package).await?;
    let msg = NotificationMessage::for_package(package, &stats);
    notifier.post(&msg).await
}
