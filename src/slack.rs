use anyhow::{Context, Result};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;

use crate::logging::FILE_TARGET;
use crate::message::NotificationMessage;

#[derive(Clone)]
pub struct SlackNotifier {
    webhook_url: Arc<String>,
    http: Arc<Client>,
}

impl SlackNotifier {
    pub fn new(webhook_url: String) -> Self {
        Self {
            webhook_url: Arc::new(webhook_url),
            http: Arc::new(Client::new()),
        }
    }

    /// Posts `msg` to the webhook. Failures are reported on stderr before being returned.
    pub async fn post(&self, msg: &NotificationMessage) -> Result<()> {
        tracing::debug!("Sending Slack message");

        if let Err(e) = self.send(msg).await {
            tracing::error!(target: FILE_TARGET, "Post to Slack failed:\n{e:#}");
            eprintln!("Post to Slack failed:\n{e:#}");
            return Err(e);
        }

        Ok(())
    }

    async fn send(&self, msg: &NotificationMessage) -> Result<()> {
        let resp = self
            .http
            .post(self.webhook_url.as_str())
            .header(CONTENT_TYPE, "application/json")
            .json(msg)
            .send()
            .await
            .context("Network error sending webhook request")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Webhook returned HTTP {}: {body}",
                status.as_u16()
            ));
        }

        Ok(())
    }
}
