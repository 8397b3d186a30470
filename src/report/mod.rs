//! The complete output of one run, validated for cross-consistency before it
//! is handed to a renderer.

use crate::config::AnalysisConfig;
use crate::error::{CoreError, CoreResult};
use crate::metrics::MetricsEngine;
use crate::models::{MetricSeries, MetricsByTicker, RawObservation, SummaryRow};
use crate::prices::{Diagnostic, PriceTable};
use crate::summary;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub prices: PriceTable,
    pub metrics: MetricsByTicker,
    pub summary: Vec<SummaryRow>,
}

impl Report {
    /// Package the three tables, rejecting any ticker mismatch between them.
    pub fn assemble(
        prices: PriceTable,
        metrics: MetricsByTicker,
        summary: Vec<SummaryRow>,
    ) -> CoreResult<Self> {
        for row in &summary {
            let series = metrics.get(&row.ticker).ok_or_else(|| {
                CoreError::InternalConsistency(format!("summary ticker {} has no metrics", row.ticker))
            })?;
            let prices_len = prices.get(&row.ticker).map(|s| s.len()).ok_or_else(|| {
                CoreError::InternalConsistency(format!("summary ticker {} has no prices", row.ticker))
            })?;
            if series.len() != prices_len {
                return Err(CoreError::InternalConsistency(format!(
                    "{}: {} metric rows for {} prices",
                    row.ticker,
                    series.len(),
                    prices_len
                )));
            }
        }

        if let Some(orphan) = metrics
            .keys()
            .find(|t| !summary.iter().any(|r| &r.ticker == *t))
        {
            return Err(CoreError::InternalConsistency(format!(
                "metrics for {} have no summary row",
                orphan
            )));
        }

        Ok(Self {
            prices,
            metrics,
            summary,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.summary.is_empty()
    }

    /// Metric series in report order.
    pub fn ordered_metrics(&self) -> impl Iterator<Item = &MetricSeries> {
        self.summary.iter().filter_map(|r| self.metrics.get(&r.ticker))
    }
}

/// Result of a full core run: the report plus rows that were skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub report: Report,
    pub diagnostics: Vec<Diagnostic>,
    /// Tickers with valid rows before the configured selection was applied.
    pub found_tickers: usize,
}

/// Raw rows → validated table → metrics → summaries → report.
pub fn analyze<I>(rows: I, config: &AnalysisConfig) -> CoreResult<Analysis>
where
    I: IntoIterator<Item = RawObservation>,
{
    let engine = MetricsEngine::new(config)?;
    let outcome = PriceTable::build(rows);
    for d in &outcome.diagnostics {
        warn!("Skipping {}", d);
    }

    let found_tickers = outcome.table.len();
    let table = outcome.table.select(&config.tickers);
    let metrics = engine.compute_all(&table)?;
    let summary = summary::aggregate(&table, &metrics)?;
    debug!("{} tickers summarised", summary.len());

    Ok(Analysis {
        report: Report::assemble(table, metrics, summary)?,
        diagnostics: outcome.diagnostics,
        found_tickers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricRow;

    fn raw(date: &str, ticker: &str, close: &str) -> RawObservation {
        RawObservation::new(date, ticker, close)
    }

    fn all_tickers() -> AnalysisConfig {
        AnalysisConfig {
            tickers: Vec::new(),
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn test_duplicate_date_scenario() {
        let analysis = analyze(
            vec![
                raw("2024-01-01", "AAPL", "100"),
                raw("2024-01-02", "AAPL", "102"),
                raw("2024-01-01", "AAPL", "99"),
            ],
            &all_tickers(),
        )
        .unwrap();
        let aapl = &analysis.report.metrics["AAPL"];
        assert_eq!(aapl.rows.iter().map(|r| r.close).collect::<Vec<_>>(), vec![99.0, 102.0]);
        assert!((aapl.rows[1].pct_change.unwrap() - 0.0303).abs() < 1e-4);
    }

    #[test]
    fn test_requested_but_missing_ticker_is_silently_absent() {
        let cfg = AnalysisConfig {
            tickers: vec!["AAPL".into(), "XXX".into()],
            ..AnalysisConfig::default()
        };
        let analysis = analyze(
            vec![raw("2024-01-01", "AAPL", "100"), raw("2024-01-02", "AAPL", "101")],
            &cfg,
        )
        .unwrap();
        let tickers: Vec<&str> = analysis.report.summary.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["AAPL"]);
        assert_eq!(analysis.found_tickers, 1);
        assert!(!analysis.report.metrics.contains_key("XXX"));
    }

    #[test]
    fn test_empty_and_all_malformed_give_empty_report() {
        let analysis = analyze(Vec::new(), &all_tickers()).unwrap();
        assert!(analysis.report.is_empty());
        assert!(analysis.report.metrics.is_empty());
        assert_eq!(analysis.report.prices, PriceTable::default());

        let analysis = analyze(vec![raw("bad", "AAPL", "1"), raw("2024-01-01", "SPY", "-1")], &all_tickers())
            .unwrap();
        assert!(analysis.report.is_empty());
        assert_eq!(analysis.diagnostics.len(), 2);
    }

    #[test]
    fn test_first_seen_order_without_selection() {
        let analysis = analyze(
            vec![
                raw("2024-01-01", "JPM", "170"),
                raw("2024-01-01", "AAPL", "184"),
                raw("2024-01-02", "JPM", "171"),
            ],
            &all_tickers(),
        )
        .unwrap();
        let order: Vec<&str> = analysis.report.ordered_metrics().map(|m| m.ticker.as_str()).collect();
        assert_eq!(order, vec!["JPM", "AAPL"]);
    }

    #[test]
    fn test_assemble_rejects_summary_without_metrics() {
        let table = PriceTable::build(vec![raw("2024-01-01", "AAPL", "100")]).table;
        let row = SummaryRow {
            ticker: "AAPL".into(),
            latest_close: Some(100.0),
            total_return: None,
            return_5d: None,
            latest_volatility: None,
        };
        let err = Report::assemble(table, MetricsByTicker::new(), vec![row]).unwrap_err();
        assert!(matches!(err, CoreError::InternalConsistency(_)));
    }

    #[test]
    fn test_assemble_rejects_orphan_and_misaligned_metrics() {
        let table = PriceTable::build(vec![raw("2024-01-01", "AAPL", "100")]).table;
        let engine = MetricsEngine::new(&all_tickers()).unwrap();
        let mut metrics = engine.compute_all(&table).unwrap();

        let err = Report::assemble(table.clone(), metrics.clone(), Vec::new()).unwrap_err();
        assert!(matches!(err, CoreError::InternalConsistency(_)));

        let summary = summary::aggregate(&table, &metrics).unwrap();
        let extra: MetricRow = metrics["AAPL"].rows[0];
        metrics.get_mut("AAPL").unwrap().rows.push(extra);
        let err = Report::assemble(table, metrics, summary).unwrap_err();
        assert!(matches!(err, CoreError::InternalConsistency(_)));
    }

    #[test]
    fn test_invalid_config_is_rejected_before_work() {
        let cfg = AnalysisConfig {
            vol_window: 1,
            ..AnalysisConfig::default()
        };
        assert!(matches!(analyze(Vec::new(), &cfg), Err(CoreError::InvalidConfig(_))));
    }
}
