use anyhow::{Context, Result};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::stats::StatsResult;

pub const DEFAULT_API_URL: &str = "https://pypistats.org/api";

const USER_AGENT: &str = "pypistats-notify";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Every pypistats endpoint wraps its payload in a `data` field.
#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct RecentStats {
    pub last_day: u64,
    pub last_week: u64,
    pub last_month: u64,
}

/// One row of the `python_major` breakdown (per interpreter major version, per day).
#[derive(Debug, Deserialize)]
pub struct VersionDownloads {
    pub downloads: u64,
}

#[derive(Clone)]
pub struct PypiStatsClient {
    base_url: Arc<Url>,
    http: Arc<Client>,
}

impl PypiStatsClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid stats API URL: {base_url}"))?;
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: Arc::new(base_url),
            http: Arc::new(http),
        })
    }

    /// `{base}/packages/{package}/{endpoint}`, with the package name encoded as one path segment.
    fn endpoint(&self, package: &str, endpoint: &str) -> Result<Url> {
        let mut url = (*self.base_url).clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Stats API URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(["packages", package, endpoint]);
        Ok(url)
    }

    async fn get_data<T: DeserializeOwned>(&self, package: &str, endpoint: &str) -> Result<T> {
        let url = self.endpoint(package, endpoint)?;

        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Network error requesting {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "pypistats returned HTTP {} for {url}: {body}",
                status.as_u16()
            ));
        }

        let envelope: Envelope<T> = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse {endpoint} response for {package:?}"))?;

        Ok(envelope.data)
    }

    /// Downloads over the last day, week and month.
    pub async fn recent(&self, package: &str) -> Result<RecentStats> {
        self.get_data(package, "recent").await
    }

    /// Daily downloads split by interpreter major version.
    pub async fn python_major(&self, package: &str) -> Result<Vec<VersionDownloads>> {
        self.get_data(package, "python_major").await
    }

    /// Both endpoints for `package`, folded into one result.
    pub async fn fetch(&self, package: &str) -> Result<StatsResult> {
        tracing::debug!("Requesting recent stats");
        let recent = self.recent(package).await?;

        tracing::debug!("Requesting total downloads");
        let by_version = self.python_major(package).await?;

        Ok(StatsResult {
            last_day: recent.last_day,
            last_week: recent.last_week,
            last_month: recent.last_month,
            total_downloads: sum_downloads(&by_version)
                .with_context(|| format!("Bad python_major data for {package:?}"))?,
        })
    }
}

/// Total of every row's `downloads`. Errors instead of wrapping on overflow.
pub fn sum_downloads(rows: &[VersionDownloads]) -> Result<u64> {
    rows.iter()
        .try_fold(0u64, |acc, r| acc.checked_add(r.downloads))
        .ok_or_else(|| anyhow::anyhow!("Download total overflows u64"))
}
