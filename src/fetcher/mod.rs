pub mod chart;
pub mod http_client;

use crate::config::FetchConfig;
use crate::models::Observation;
use crate::prices::cleaner::normalise_symbol;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

use self::chart::parse_chart;
use self::http_client::HttpClient;

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable data source abstraction.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_history(&self, symbol: &str) -> Result<Vec<Observation>>;
}

// ── Yahoo chart API ───────────────────────────────────────────────────────────

pub struct YahooChartSource {
    client: HttpClient,
    base_url: String,
    range: String,
    interval: String,
}

impl YahooChartSource {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            range: config.range.clone(),
            interval: config.interval.clone(),
        })
    }

    /// e.g. `AAPL` → `/v8/finance/chart/AAPL?range=3mo&interval=1d`
    fn history_url(&self, symbol: &str) -> Result<Url> {
        let url = Url::parse_with_params(
            &format!("{}/{}", self.base_url, symbol),
            &[
                ("range", self.range.as_str()),
                ("interval", self.interval.as_str()),
                ("events", "history"),
            ],
        )?;
        Ok(url)
    }
}

#[async_trait]
impl MarketDataSource for YahooChartSource {
    async fn fetch_history(&self, symbol: &str) -> Result<Vec<Observation>> {
        let symbol = normalise_symbol(symbol);
        let url = self.history_url(&symbol)?;
        info!("Fetching {} ({}, {})", symbol, self.range, self.interval);

        let body = self
            .client
            .get_text(&url)
            .await
            .with_context(|| format!("Failed to fetch history for {}", symbol))?;

        let bars = parse_chart(&symbol, &body)
            .with_context(|| format!("Failed to decode history for {}", symbol))?;
        debug!("{}: {} bars", symbol, bars.len());
        Ok(bars)
    }
}

// ── CSV output ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct PriceCsvRow<'a> {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Ticker")]
    ticker: &'a str,
    #[serde(rename = "Close")]
    close: f64,
}

/// Write `<dir>/<SYMBOL>.csv` with `Date,Ticker,Close` rows, replacing any
/// previous file for that symbol.
pub fn save_history(dir: &Path, symbol: &str, bars: &[Observation]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("Could not create dir {:?}", dir))?;
    let path = dir.join(format!("{}.csv", normalise_symbol(symbol)));

    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create {:?}", path))?;
    for bar in bars {
        writer.serialize(PriceCsvRow {
            date: bar.date,
            ticker: &bar.ticker,
            close: bar.close,
        })?;
    }
    writer.flush()?;
    Ok(path)
}
