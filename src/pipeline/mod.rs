//! Pipeline orchestrator: ties fetcher → CSV files → metrics → report sheets.
//!
//! ## Run modes
//!
//! `fetch()` — download history for every configured ticker and rewrite
//!   `<data_dir>/<TICKER>.csv`. A failing ticker is logged and counted; the
//!   rest of the batch carries on.
//!
//! `build()` — load every CSV in `data_dir`, compute metrics and summaries,
//!   and write the report sheets into `output_dir`. No data is a valid
//!   outcome and produces an empty report.

use crate::config::AppConfig;
use crate::fetcher::{save_history, MarketDataSource};
use crate::loader::load_dir;
use crate::metrics::{insert_once, MetricsEngine};
use crate::models::{MetricsByTicker, RawObservation};
use crate::prices::cleaner::normalise_symbol;
use crate::prices::PriceTable;
use crate::render::{SheetFormat, SheetWriter};
use crate::report::{self, Analysis, Report};
use crate::summary;
use anyhow::{Context, Result};
use chrono::Local;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

pub struct Pipeline {
    config: AppConfig,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub async fn fetch(&self, source: Arc<dyn MarketDataSource>) -> Result<FetchStats> {
        let symbols = unique_symbols(&self.config.analysis.tickers);
        info!("=== Fetching {} tickers ===", symbols.len());

        let sem = Arc::new(Semaphore::new(self.config.pipeline.concurrency.max(1)));
        let mut handles = Vec::new();

        for symbol in symbols {
            let key = symbol.clone();
            let source = Arc::clone(&source);
            let sem = Arc::clone(&sem);
            let data_dir = self.config.data.data_dir.clone();

            let handle = tokio::spawn(async move {
                let _permit = sem.acquire().await?;

                let bars = source
                    .fetch_history(&symbol)
                    .await
                    .with_context(|| format!("fetch_history({})", symbol))?;

                if bars.is_empty() {
                    warn!("{}: no data returned, skipping", symbol);
                    return Ok::<usize, anyhow::Error>(0);
                }

                let path = save_history(&data_dir, &symbol, &bars)
                    .with_context(|| format!("save_history({})", symbol))?;
                info!("{}: {} bars → {:?}", symbol, bars.len(), path);
                Ok(bars.len())
            });

            handles.push((key, handle));
        }

        let mut stats = FetchStats::default();
        for (symbol, handle) in handles {
            match handle.await {
                Ok(Ok(0)) => stats.empty += 1,
                Ok(Ok(n)) => {
                    stats.tickers += 1;
                    stats.bars += n;
                }
                Ok(Err(e)) => {
                    warn!("{}: {:#}", symbol, e);
                    stats.errors += 1;
                }
                Err(e) => {
                    error!("Task panic for {}: {}", symbol, e);
                    stats.errors += 1;
                }
            }
        }

        info!(
            "=== Fetched: {} tickers | {} bars | {} empty | {} errors ===",
            stats.tickers, stats.bars, stats.empty, stats.errors
        );
        Ok(stats)
    }

    /// Load the data directory and run the metrics core over it.
    pub async fn analyze(&self) -> Result<(Analysis, LoadStats)> {
        let loaded = load_dir(&self.config.data.data_dir)?;
        let load_stats = LoadStats {
            files: loaded.files,
            skipped_files: loaded.skipped_files,
            unreadable: loaded.unreadable,
        };

        let analysis = if self.config.pipeline.concurrency > 1 {
            self.analyze_parallel(loaded.rows).await?
        } else {
            report::analyze(loaded.rows, &self.config.analysis)?
        };

        if !analysis.diagnostics.is_empty() {
            warn!("{} malformed rows skipped", analysis.diagnostics.len());
        }
        Ok((analysis, load_stats))
    }

    /// Same result as [`report::analyze`], with each ticker's metrics computed
    /// on the blocking pool.
    async fn analyze_parallel(&self, rows: Vec<RawObservation>) -> Result<Analysis> {
        let engine = Arc::new(MetricsEngine::new(&self.config.analysis)?);
        let outcome = PriceTable::build(rows);
        for d in &outcome.diagnostics {
            warn!("Skipping {}", d);
        }
        let found_tickers = outcome.table.len();
        let table = outcome.table.select(&self.config.analysis.tickers);

        let sem = Arc::new(Semaphore::new(self.config.pipeline.concurrency));
        let mut handles = Vec::with_capacity(table.len());
        for series in table.iter().cloned() {
            let engine = Arc::clone(&engine);
            let permit = Arc::clone(&sem).acquire_owned().await?;
            handles.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                engine.compute(&series)
            }));
        }

        let mut metrics = MetricsByTicker::with_capacity(handles.len());
        for handle in handles {
            let series = handle.await.context("Metrics task panicked")?;
            insert_once(&mut metrics, series)?;
        }

        let summary = summary::aggregate(&table, &metrics)?;
        let report = Report::assemble(table, metrics, summary)?;
        Ok(Analysis {
            report,
            diagnostics: outcome.diagnostics,
            found_tickers,
        })
    }

    /// Why the report came out empty, if it did.
    fn empty_report_reason(&self, analysis: &Analysis) -> Option<String> {
        if !analysis.report.is_empty() {
            return None;
        }
        if analysis.found_tickers > 0 {
            return Some(format!(
                "None of the configured tickers [{}] matched the {} tickers found in {:?}",
                self.config.analysis.tickers.join(", "),
                analysis.found_tickers,
                self.config.data.data_dir
            ));
        }
        Some(format!("No valid price rows found in {:?}", self.config.data.data_dir))
    }

    pub async fn build(&self) -> Result<PipelineStats> {
        let (analysis, load) = self.analyze().await?;
        let report = &analysis.report;

        let format = SheetFormat::new(&self.config.analysis, self.config.pipeline.precision);
        SheetWriter::new(report, format)
            .write_all(&self.config.data.output_dir, Local::now().naive_local())
            .context("Failed to write report")?;

        if let Some(reason) = self.empty_report_reason(&analysis) {
            warn!("{}; wrote an empty report", reason);
        }

        if load.skipped_files > 0 {
            warn!("{} CSV files had no Date/Close columns", load.skipped_files);
        }

        let stats = PipelineStats {
            files: load.files,
            tickers: report.summary.len(),
            rows: report.prices.row_count(),
            skipped_rows: analysis.diagnostics.len() + load.unreadable,
        };
        info!(
            "=== Done: {} files | {} tickers | {} rows | {} skipped ===",
            stats.files, stats.tickers, stats.rows, stats.skipped_rows
        );
        Ok(stats)
    }
}

/// Normalised symbols, first occurrence kept. One task per output file.
fn unique_symbols(tickers: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tickers
        .iter()
        .map(|t| normalise_symbol(t))
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct FetchStats {
    pub tickers: usize,
    pub bars: usize,
    pub empty: usize,
    pub errors: usize,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct LoadStats {
    pub files: usize,
    pub skipped_files: usize,
    pub unreadable: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineStats {
    pub files: usize,
    pub tickers: usize,
    pub rows: usize,
    pub skipped_rows: usize,
}
