use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use tracing::debug;

use super::Probe;

/// Per-request timeout so a hung check cannot stall the poll chain.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Existence check via an uncached `HEAD` request. Any 2xx means ready.
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn check(&self, locator: &str) -> Result<bool> {
        let resp = self
            .client
            .head(locator)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;
        let status = resp.status();
        debug!(%status, locator, "probe response");
        Ok(status.is_success())
    }
}
