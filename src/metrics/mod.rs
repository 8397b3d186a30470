//! Per-ticker metric series: daily percent change, two simple moving
//! averages and an annualized rolling volatility.
//!
//! Every output series has the same length as its input. Values that need
//! more history than is available are `None`; partial windows are never
//! averaged.

use crate::config::AnalysisConfig;
use crate::error::{CoreError, CoreResult};
use crate::models::{MetricRow, MetricSeries, MetricsByTicker, TickerSeries};
use crate::prices::PriceTable;
use tracing::debug;

/// `close[i] / close[i-1] - 1`, `None` at index 0.
pub fn pct_change(closes: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(closes.len());
    if closes.is_empty() {
        return out;
    }
    out.push(None);
    out.extend(closes.windows(2).map(|w| Some(w[1] / w[0] - 1.0)));
    out
}

/// Simple moving average over exactly `period` values.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        out[i] = Some(window.iter().sum::<f64>() / period as f64);
    }
    out
}

/// Sample standard deviation (N-1 denominator); `None` below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1.0);
    Some(var.sqrt())
}

/// Annualized volatility of the returns inside a trailing window of `window`
/// observations. Defined from index `window - 1` onwards.
pub fn rolling_volatility(
    returns: &[Option<f64>],
    window: usize,
    trading_days: f64,
) -> Vec<Option<f64>> {
    let mut out = vec![None; returns.len()];
    if window == 0 || returns.len() < window {
        return out;
    }

    let scale = trading_days.sqrt();
    for i in (window - 1)..returns.len() {
        let defined: Vec<f64> = returns[i + 1 - window..=i].iter().flatten().copied().collect();
        out[i] = sample_std(&defined).map(|sd| sd * scale);
    }
    out
}

/// Stateless calculator turning one ticker's closes into its metric series.
#[derive(Debug, Clone)]
pub struct MetricsEngine {
    config: AnalysisConfig,
}

impl MetricsEngine {
    pub fn new(config: &AnalysisConfig) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
        })
    }

    pub fn compute(&self, series: &TickerSeries) -> MetricSeries {
        let closes = series.closes();
        let pct = pct_change(&closes);
        let ma_short = rolling_mean(&closes, self.config.short_window);
        let ma_long = rolling_mean(&closes, self.config.long_window);
        let vol = rolling_volatility(&pct, self.config.vol_window, self.config.trading_days);

        let rows = series
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| MetricRow {
                date: p.date,
                close: p.close,
                pct_change: pct[i],
                ma_short: ma_short[i],
                ma_long: ma_long[i],
                volatility: vol[i],
            })
            .collect();

        debug!("{}: {} metric rows", series.ticker, closes.len());
        MetricSeries {
            ticker: series.ticker.clone(),
            rows,
        }
    }

    /// Compute every ticker of `table` sequentially.
    pub fn compute_all(&self, table: &PriceTable) -> CoreResult<MetricsByTicker> {
        let mut out = MetricsByTicker::with_capacity(table.len());
        for series in table.iter() {
            insert_once(&mut out, self.compute(series))?;
        }
        Ok(out)
    }
}

/// Insert a ticker's series, refusing a second write for the same ticker.
pub fn insert_once(map: &mut MetricsByTicker, series: MetricSeries) -> CoreResult<()> {
    if map.contains_key(&series.ticker) {
        return Err(CoreError::InternalConsistency(format!(
            "metric series for {} written twice",
            series.ticker
        )));
    }
    map.insert(series.ticker.clone(), series);
    Ok(())
}
