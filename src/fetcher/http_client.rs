use crate::config::FetchConfig;
use crate::error::FetchError;
use anyhow::{Context, Result};
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, warn};
use url::Url;

pub struct HttpClient {
    inner: reqwest::Client,
    config: FetchConfig,
}

impl HttpClient {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            // the chart endpoint hands out a consent cookie on first contact
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            inner,
            config: config.clone(),
        })
    }

    /// Fetch a URL as text with rate-limiting and retry.
    ///
    /// Rate limiting (429), server errors and transport failures back off
    /// exponentially from `request_delay_ms`; any other status fails at once.
    pub async fn get_text(&self, url: &Url) -> Result<String, FetchError> {
        self.polite_delay().await;

        let strategy = ExponentialBackoff::from_millis(2)
            .factor(self.config.request_delay_ms.max(1))
            .map(jitter)
            .take(self.config.max_retries as usize);

        RetryIf::start(
            strategy,
            || self.get_once(url),
            |e: &FetchError| {
                let retry = e.is_transient();
                if retry {
                    warn!("GET {} failed ({}), retrying", url, e);
                }
                retry
            },
        )
        .await
    }

    async fn get_once(&self, url: &Url) -> Result<String, FetchError> {
        debug!("GET {}", url);
        let resp = self.inner.get(url.as_str()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp.text().await?)
    }

    /// Sleep for the configured delay + random jitter.
    async fn polite_delay(&self) {
        let jitter = rand::thread_rng().gen_range(0..=self.config.jitter_ms);
        sleep(Duration::from_millis(self.config.request_delay_ms + jitter)).await;
    }
}
