use crate::error::{CoreError, CoreResult};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Market-data download configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Provider history range, e.g. `1mo`, `3mo`, `1y`, `max`.
    #[serde(default = "default_range")]
    pub range: String,

    /// Bar interval, e.g. `1d`, `1wk`.
    #[serde(default = "default_interval")]
    pub interval: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Where price CSVs are read from and report sheets are written to
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

/// Parameters of the metrics computation.
///
/// `tickers` selects and orders the report; an empty list keeps every ticker
/// found, in the order first seen.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_tickers")]
    pub tickers: Vec<String>,

    #[serde(default = "default_short_window")]
    pub short_window: usize,

    #[serde(default = "default_long_window")]
    pub long_window: usize,

    #[serde(default = "default_vol_window")]
    pub vol_window: usize,

    /// Annualization factor applied as `sqrt(trading_days)`.
    #[serde(default = "default_trading_days")]
    pub trading_days: f64,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Decimal places used when writing numbers to the report.
    #[serde(default = "default_precision")]
    pub precision: usize,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "https://query1.finance.yahoo.com/v8/finance/chart".to_string()
}
fn default_range() -> String {
    "3mo".to_string()
}
fn default_interval() -> String {
    "1d".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_request_delay_ms() -> u64 {
    500
}
fn default_jitter_ms() -> u64 {
    250
}
fn default_max_retries() -> u32 {
    3
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) market-insights/0.1".to_string()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("report")
}
fn default_tickers() -> Vec<String> {
    vec!["AAPL".to_string(), "SPY".to_string(), "JPM".to_string()]
}
fn default_short_window() -> usize {
    10
}
fn default_long_window() -> usize {
    30
}
fn default_vol_window() -> usize {
    10
}
fn default_trading_days() -> f64 {
    252.0
}
fn default_concurrency() -> usize {
    3
}
fn default_precision() -> usize {
    6
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            range: default_range(),
            interval: default_interval(),
            timeout_secs: default_timeout_secs(),
            request_delay_ms: default_request_delay_ms(),
            jitter_ms: default_jitter_ms(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tickers: default_tickers(),
            short_window: default_short_window(),
            long_window: default_long_window(),
            vol_window: default_vol_window(),
            trading_days: default_trading_days(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            precision: default_precision(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.short_window == 0 || self.long_window == 0 {
            return Err(CoreError::InvalidConfig(
                "moving-average windows must be at least 1".into(),
            ));
        }
        // a sample standard deviation needs two returns, i.e. three closes
        if self.vol_window < 3 {
            return Err(CoreError::InvalidConfig(format!(
                "volatility window must be at least 3, got {}",
                self.vol_window
            )));
        }
        if !(self.trading_days.is_finite() && self.trading_days > 0.0) {
            return Err(CoreError::InvalidConfig(format!(
                "trading_days must be positive, got {}",
                self.trading_days
            )));
        }
        Ok(())
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::Environment::with_prefix("MARKET")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("analysis.tickers")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration sources")?;

        let app_cfg: AppConfig = cfg
            .try_deserialize()
            .context("Invalid configuration")?;
        app_cfg.analysis.validate()?;
        Ok(app_cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.analysis.short_window, 10);
        assert_eq!(cfg.analysis.long_window, 30);
        assert_eq!(cfg.analysis.vol_window, 10);
        assert_eq!(cfg.analysis.trading_days, 252.0);
        assert_eq!(cfg.analysis.tickers, vec!["AAPL", "SPY", "JPM"]);
        assert!(cfg.analysis.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[analysis]\ntickers = [\"MSFT\"]\nlong_window = 20\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(cfg.analysis.tickers, vec!["MSFT"]);
        assert_eq!(cfg.analysis.long_window, 20);
        assert_eq!(cfg.analysis.short_window, 10);
        assert_eq!(cfg.fetch.range, "3mo");
        assert_eq!(cfg.pipeline.concurrency, 3);
    }

    #[test]
    fn test_validate_rejects_degenerate_windows() {
        let mut cfg = AnalysisConfig::default();
        cfg.vol_window = 2;
        assert!(matches!(cfg.validate(), Err(CoreError::InvalidConfig(_))));

        let mut cfg = AnalysisConfig::default();
        cfg.short_window = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AnalysisConfig::default();
        cfg.trading_days = 0.0;
        assert!(cfg.validate().is_err());
    }
}
