//! Decoding of the v8 chart endpoint's JSON payload.

use crate::error::FetchError;
use crate::models::Observation;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartData>>,
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
    symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
    adjclose: Option<Vec<AdjCloseBlock>>,
}

#[derive(Debug, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseBlock {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Exchange-local calendar date of a bar timestamp.
fn bar_date(ts: i64, gmtoffset: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(ts + gmtoffset, 0).map(|dt| dt.date_naive())
}

/// Parse a chart payload into daily closes for `symbol`.
///
/// Bars with a null close fall back to the adjusted close; bars with neither
/// are dropped. An empty result is not an error.
pub fn parse_chart(symbol: &str, json: &str) -> Result<Vec<Observation>, FetchError> {
    let response: ChartResponse = serde_json::from_str(json)?;

    if let Some(err) = response.chart.error {
        return Err(FetchError::Provider {
            code: err.code,
            description: err.description,
        });
    }

    let Some(data) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(vec![]);
    };

    let ticker = data
        .meta
        .symbol
        .as_deref()
        .unwrap_or(symbol)
        .trim()
        .to_uppercase();
    let closes = data.indicators.quote.first().map(|q| q.close.as_slice()).unwrap_or(&[]);
    let adj = data
        .indicators
        .adjclose
        .as_ref()
        .and_then(|a| a.first())
        .map(|a| a.adjclose.as_slice())
        .unwrap_or(&[]);

    let mut out = Vec::with_capacity(data.timestamp.len());
    for (i, &ts) in data.timestamp.iter().enumerate() {
        let close = closes.get(i).copied().flatten().or_else(|| adj.get(i).copied().flatten());
        let (Some(close), Some(date)) = (close, bar_date(ts, data.meta.gmtoffset)) else {
            debug!("{}: dropping bar {} with no close", ticker, ts);
            continue;
        };
        out.push(Observation {
            date,
            ticker: ticker.clone(),
            close,
        });
    }

    Ok(out)
}
