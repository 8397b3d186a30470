//! Price table construction: validate raw rows, dedup, group per ticker.
//!
//! Rows are applied in input order. When two rows share a (date, ticker) key
//! the later one replaces the earlier one, so a fresh fetch appended after a
//! stale CSV wins. Bad rows never abort the build; each is recorded as a
//! [`Diagnostic`] in the returned [`BuildOutcome`].

pub mod cleaner;

use crate::error::MalformedObservation;
use crate::models::{PricePoint, RawObservation, TickerSeries};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use self::cleaner::clean_observation;

/// A skipped input row: its zero-based position in the input, where it was
/// read from (if known) and the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub row: usize,
    pub origin: Option<String>,
    pub error: MalformedObservation,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            Some(origin) => write!(f, "{}: {}", origin, self.error),
            None => write!(f, "row {}: {}", self.row, self.error),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutcome {
    pub table: PriceTable,
    pub diagnostics: Vec<Diagnostic>,
}

/// Per-ticker closes, tickers kept in first-encountered order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    series: Vec<TickerSeries>,
}

impl PriceTable {
    pub fn build<I>(rows: I) -> BuildOutcome
    where
        I: IntoIterator<Item = RawObservation>,
    {
        let mut order: Vec<String> = Vec::new();
        let mut by_ticker: HashMap<String, BTreeMap<NaiveDate, f64>> = HashMap::new();
        let mut diagnostics = Vec::new();

        for (row, raw) in rows.into_iter().enumerate() {
            match clean_observation(&raw) {
                Ok(obs) => {
                    let closes = by_ticker.entry(obs.ticker.clone()).or_insert_with(|| {
                        order.push(obs.ticker.clone());
                        BTreeMap::new()
                    });
                    closes.insert(obs.date, obs.close);
                }
                Err(error) => diagnostics.push(Diagnostic {
                    row,
                    origin: raw.origin,
                    error,
                }),
            }
        }

        let series = order
            .into_iter()
            .filter_map(|ticker| {
                let closes = by_ticker.remove(&ticker)?;
                let points = closes
                    .into_iter()
                    .map(|(date, close)| PricePoint { date, close })
                    .collect();
                Some(TickerSeries { ticker, points })
            })
            .collect();

        BuildOutcome {
            table: PriceTable { series },
            diagnostics,
        }
    }

    pub fn get(&self, ticker: &str) -> Option<&TickerSeries> {
        self.series.iter().find(|s| s.ticker == ticker)
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|s| s.ticker.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &TickerSeries> {
        self.series.iter()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn row_count(&self) -> usize {
        self.series.iter().map(TickerSeries::len).sum()
    }

    /// Keep only `tickers`, in that order. An empty selection keeps everything.
    /// Requested symbols with no data are dropped without error.
    pub fn select(self, tickers: &[String]) -> PriceTable {
        if tickers.is_empty() {
            return self;
        }
        let mut remaining: HashMap<String, TickerSeries> = self
            .series
            .into_iter()
            .map(|s| (s.ticker.clone(), s))
            .collect();
        let series = tickers
            .iter()
            .filter_map(|t| remaining.remove(&cleaner::normalise_symbol(t)))
            .collect();
        PriceTable { series }
    }

    /// Union of all dates across tickers, ascending.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.date))
            .collect();
        dates.sort_unstable();
        dates.dedup();
        dates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(date: &str, ticker: &str, close: &str) -> RawObservation {
        RawObservation::new(date, ticker, close)
    }

    #[test]
    fn test_later_duplicate_wins() {
        let outcome = PriceTable::build(vec![
            raw("2024-01-01", "AAPL", "100"),
            raw("2024-01-02", "AAPL", "102"),
            raw("2024-01-01", "AAPL", "99"),
        ]);
        let aapl = outcome.table.get("AAPL").unwrap();
        let got: Vec<(String, f64)> = aapl
            .points
            .iter()
            .map(|p| (p.date.to_string(), p.close))
            .collect();
        assert_eq!(
            got,
            vec![("2024-01-01".to_string(), 99.0), ("2024-01-02".to_string(), 102.0)]
        );
        assert_eq!(outcome.diagnostics.len(), 0);
    }

    #[test]
    fn test_sorted_and_grouped_in_first_seen_order() {
        let outcome = PriceTable::build(vec![
            raw("2024-01-03", "SPY", "470"),
            raw("2024-01-02", "AAPL", "185"),
            raw("2024-01-02", "SPY", "468"),
            raw("2024-01-01", "AAPL", "184"),
        ]);
        let table = outcome.table;
        assert_eq!(table.tickers().collect::<Vec<_>>(), vec!["SPY", "AAPL"]);
        let spy = table.get("SPY").unwrap();
        assert!(spy.points.windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(spy.closes(), vec![468.0, 470.0]);
        assert_eq!(table.row_count(), 4);
    }

    #[test]
    fn test_malformed_rows_are_counted_not_fatal() {
        let outcome = PriceTable::build(vec![
            raw("2024-01-01", "AAPL", "100"),
            raw("not-a-date", "AAPL", "101"),
            raw("2024-01-03", "AAPL", "-4"),
            raw("2024-01-04", "AAPL", "0"),
            raw("2024-01-05", "AAPL", "103"),
        ]);
        assert_eq!(outcome.diagnostics.len(), 3);
        assert_eq!(
            outcome.diagnostics.iter().map(|d| d.row).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(outcome.table.get("AAPL").unwrap().len(), 2);
    }

    #[test]
    fn test_diagnostic_names_source_location() {
        let located = RawObservation {
            origin: Some("data/AAPL.csv:4".into()),
            ..raw("2024-01-02", "AAPL", "abc")
        };
        let outcome = PriceTable::build(vec![raw("2024-01-01", "AAPL", "0"), located]);
        let messages: Vec<String> = outcome.diagnostics.iter().map(|d| d.to_string()).collect();
        assert_eq!(
            messages,
            vec![
                "row 0: non-positive close 0".to_string(),
                "data/AAPL.csv:4: unparseable close \"abc\"".to_string(),
            ]
        );
    }

    #[test]
    fn test_empty_and_all_malformed_inputs_give_empty_table() {
        assert_eq!(PriceTable::build(Vec::new()).table.len(), 0);

        let outcome = PriceTable::build(vec![raw("x", "AAPL", "1"), raw("2024-01-01", "AAPL", "0")]);
        assert_eq!(outcome.table.len(), 0);
        assert_eq!(outcome.diagnostics.len(), 2);
    }

    #[test]
    fn test_build_is_deterministic() {
        let rows = vec![
            raw("2024-01-02", "JPM", "170"),
            raw("2024-01-01", "JPM", "168"),
            raw("2024-01-02", "JPM", "171"),
            raw("2024-01-01", "AAPL", "184"),
        ];
        let first = PriceTable::build(rows.clone());
        let second = PriceTable::build(rows);
        assert_eq!(first, second);
    }

    #[test]
    fn test_select_orders_and_drops_missing() {
        let table = PriceTable::build(vec![
            raw("2024-01-01", "AAPL", "184"),
            raw("2024-01-01", "SPY", "470"),
            raw("2024-01-01", "JPM", "168"),
        ])
        .table;
        let picked = table.select(&["jpm".to_string(), "XXX".to_string(), "AAPL".to_string()]);
        assert_eq!(picked.tickers().collect::<Vec<_>>(), vec!["JPM", "AAPL"]);
    }

    #[test]
    fn test_dates_union() {
        let table = PriceTable::build(vec![
            raw("2024-01-02", "AAPL", "184"),
            raw("2024-01-01", "SPY", "470"),
            raw("2024-01-02", "SPY", "471"),
        ])
        .table;
        let dates: Vec<String> = table.dates().iter().map(|d| d.to_string()).collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-02"]);
    }
}
