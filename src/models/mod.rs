use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ── Observation ───────────────────────────────────────────────────────────────

/// One validated closing price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub ticker: String,
    pub close: f64,
}

// ── Raw rows ──────────────────────────────────────────────────────────────────

/// An unvalidated input row, as read from a CSV or assembled by a fetcher.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawObservation {
    pub date: Option<String>,
    pub ticker: Option<String>,
    pub close: Option<String>,
    /// `path:line` of the source record, when it came from a file.
    pub origin: Option<String>,
}

#[cfg(test)]
impl RawObservation {
    pub fn new(date: &str, ticker: &str, close: &str) -> Self {
        Self {
            date: Some(date.to_string()),
            ticker: Some(ticker.to_string()),
            close: Some(close.to_string()),
            origin: None,
        }
    }
}

// ── Price points ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Date-sorted, deduplicated closes of one ticker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TickerSeries {
    pub ticker: String,
    pub points: Vec<PricePoint>,
}

impl TickerSeries {
    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }
}

// ── Metrics ───────────────────────────────────────────────────────────────────

/// Per-date metrics; `None` marks a value that is not available yet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MetricRow {
    pub date: NaiveDate,
    pub close: f64,
    pub pct_change: Option<f64>,
    pub ma_short: Option<f64>,
    pub ma_long: Option<f64>,
    pub volatility: Option<f64>,
}

/// Metric rows of one ticker, index-aligned with its [`TickerSeries`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricSeries {
    pub ticker: String,
    pub rows: Vec<MetricRow>,
}

impl MetricSeries {
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

pub type MetricsByTicker = HashMap<String, MetricSeries>;

// ── Summary ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryRow {
    pub ticker: String,
    pub latest_close: Option<f64>,
    pub total_return: Option<f64>,
    pub return_5d: Option<f64>,
    pub latest_volatility: Option<f64>,
}
