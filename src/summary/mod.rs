//! Fold each ticker's metric series into a single KPI row.

use crate::error::{CoreError, CoreResult};
use crate::models::{MetricSeries, MetricsByTicker, SummaryRow};
use crate::prices::PriceTable;

/// Trading days looked back for the short-horizon return.
pub const RECENT_RETURN_DAYS: usize = 5;

/// One KPI row. `None` for an empty series; otherwise each field is `None`
/// only when the series is too short for it.
pub fn summarize(series: &MetricSeries) -> Option<SummaryRow> {
    let last = series.rows.last()?;
    let n = series.rows.len();

    let total_return = (n >= 2).then(|| last.close / series.rows[0].close - 1.0);
    let return_5d = (n > RECENT_RETURN_DAYS)
        .then(|| last.close / series.rows[n - 1 - RECENT_RETURN_DAYS].close - 1.0);
    let latest_volatility = series.rows.iter().rev().find_map(|r| r.volatility);

    Some(SummaryRow {
        ticker: series.ticker.clone(),
        latest_close: Some(last.close),
        total_return,
        return_5d,
        latest_volatility,
    })
}

/// Summaries in the order of `table`'s tickers.
pub fn aggregate(table: &PriceTable, metrics: &MetricsByTicker) -> CoreResult<Vec<SummaryRow>> {
    let mut rows = Vec::with_capacity(table.len());
    for ticker in table.tickers() {
        let series = metrics.get(ticker).ok_or_else(|| {
            CoreError::InternalConsistency(format!("no metric series for {}", ticker))
        })?;
        rows.extend(summarize(series));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::metrics::MetricsEngine;
    use crate::models::RawObservation;
    use chrono::{Duration, NaiveDate};

    fn table_of(tickers: &[(&str, &[f64])]) -> PriceTable {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let rows = tickers.iter().flat_map(|(t, closes)| {
            closes.iter().enumerate().map(move |(i, c)| {
                let date = start + Duration::days(i as i64);
                RawObservation::new(&date.to_string(), t, &c.to_string())
            })
        });
        PriceTable::build(rows.collect::<Vec<_>>()).table
    }

    fn summaries(table: &PriceTable) -> Vec<SummaryRow> {
        let engine = MetricsEngine::new(&AnalysisConfig::default()).unwrap();
        let metrics = engine.compute_all(table).unwrap();
        aggregate(table, &metrics).unwrap()
    }

    #[test]
    fn test_two_point_total_return() {
        let rows = summaries(&table_of(&[("AAPL", &[100.0, 110.0])]));
        let total = rows[0].total_return.unwrap();
        assert!((total - 0.10).abs() < 1e-12);
        assert_eq!(rows[0].return_5d, None);
        assert_eq!(rows[0].latest_close, Some(110.0));
    }

    #[test]
    fn test_single_observation_row() {
        let rows = summaries(&table_of(&[("NEW", &[42.0])]));
        assert_eq!(
            rows[0],
            SummaryRow {
                ticker: "NEW".into(),
                latest_close: Some(42.0),
                total_return: None,
                return_5d: None,
                latest_volatility: None,
            }
        );
    }

    #[test]
    fn test_six_observations_have_5d_return_but_no_volatility() {
        let closes = [100.0, 101.0, 99.0, 102.0, 103.0, 105.0];
        let rows = summaries(&table_of(&[("IPO", &closes)]));
        let r5 = rows[0].return_5d.unwrap();
        assert!((r5 - (105.0 / 100.0 - 1.0)).abs() < 1e-12);
        assert_eq!(rows[0].latest_volatility, None);
    }

    #[test]
    fn test_latest_volatility_from_ten_observations() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + (i * i) as f64).collect();
        let table = table_of(&[("VOL", &closes)]);
        let engine = MetricsEngine::new(&AnalysisConfig::default()).unwrap();
        let metrics = engine.compute_all(&table).unwrap();
        let rows = aggregate(&table, &metrics).unwrap();
        assert_eq!(rows[0].latest_volatility, metrics["VOL"].rows[9].volatility);
        assert!(rows[0].latest_volatility.is_some());
    }

    #[test]
    fn test_order_follows_table_and_missing_ticker_is_absent() {
        let table = table_of(&[("SPY", &[1.0, 2.0]), ("AAPL", &[3.0, 4.0]), ("JPM", &[5.0])])
            .select(&["JPM".into(), "XXX".into(), "SPY".into()]);
        let rows = summaries(&table);
        let order: Vec<&str> = rows.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(order, vec!["JPM", "SPY"]);
    }

    #[test]
    fn test_missing_metric_series_is_internal_error() {
        let table = table_of(&[("AAPL", &[1.0, 2.0])]);
        let err = aggregate(&table, &MetricsByTicker::new()).unwrap_err();
        assert!(matches!(err, CoreError::InternalConsistency(_)));
    }
}
