//! Serializes a [`Report`] into the dashboard's sheets.
//!
//! Output directory layout:
//!   RawData.csv    combined price series (Date, Ticker, Close)
//!   Metrics.csv    per-date metrics for every ticker
//!   Summary.csv    one KPI row per ticker
//!   Dashboard.csv  trend pivot (Date × ticker) and summary block, the chart sources
//!   Dashboard.txt  text renderings of the trend and total-return charts

pub mod charts;

use crate::config::AnalysisConfig;
use crate::report::Report;
use crate::utils::fmt_cell;
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DASHBOARD_TITLE: &str = "Financial Market Insights Dashboard";

const CHART_WIDTH: usize = 40;

/// Column layout and rounding used when writing sheets.
#[derive(Debug, Clone)]
pub struct SheetFormat {
    pub precision: usize,
    pub short_window: usize,
    pub long_window: usize,
    pub vol_window: usize,
}

impl SheetFormat {
    pub fn new(analysis: &AnalysisConfig, precision: usize) -> Self {
        Self {
            precision,
            short_window: analysis.short_window,
            long_window: analysis.long_window,
            vol_window: analysis.vol_window,
        }
    }

    fn vol_header(&self) -> String {
        format!("Vol_{}", self.vol_window)
    }

    fn metrics_header(&self) -> Vec<String> {
        vec![
            "Date".into(),
            "Ticker".into(),
            "Close".into(),
            "Pct_Change".into(),
            format!("MA_{}", self.short_window),
            format!("MA_{}", self.long_window),
            self.vol_header(),
        ]
    }

    fn summary_header(&self) -> Vec<String> {
        vec![
            "Ticker".into(),
            "Total_Return".into(),
            "Return_5D".into(),
            self.vol_header(),
            "Last_Close".into(),
        ]
    }

    fn cell(&self, v: Option<f64>) -> String {
        fmt_cell(v, self.precision)
    }
}

pub struct SheetWriter<'a> {
    report: &'a Report,
    format: SheetFormat,
}

impl<'a> SheetWriter<'a> {
    pub fn new(report: &'a Report, format: SheetFormat) -> Self {
        Self { report, format }
    }

    /// Write every sheet into `dir`, replacing earlier output.
    pub fn write_all(&self, dir: &Path, generated: NaiveDateTime) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir).with_context(|| format!("Could not create dir {:?}", dir))?;

        let written = vec![
            self.write_sheet(dir, "RawData.csv", |w| self.raw_data(w))?,
            self.write_sheet(dir, "Metrics.csv", |w| self.metrics(w))?,
            self.write_sheet(dir, "Summary.csv", |w| self.summary(w))?,
            self.write_sheet(dir, "Dashboard.csv", |w| self.dashboard(w, generated))?,
            self.write_text(dir, "Dashboard.txt", &self.dashboard_text(generated))?,
        ];

        info!("Report written to {:?} ({} files)", dir, written.len());
        Ok(written)
    }

    fn write_sheet<F>(&self, dir: &Path, name: &str, fill: F) -> Result<PathBuf>
    where
        F: FnOnce(&mut csv::Writer<std::fs::File>) -> csv::Result<()>,
    {
        let path = dir.join(name);
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&path)
            .with_context(|| format!("Failed to create {:?}", path))?;
        fill(&mut writer).with_context(|| format!("Failed to write {:?}", path))?;
        writer.flush()?;
        Ok(path)
    }

    fn write_text(&self, dir: &Path, name: &str, text: &str) -> Result<PathBuf> {
        let path = dir.join(name);
        std::fs::write(&path, text).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(path)
    }

    fn raw_data<W: std::io::Write>(&self, w: &mut csv::Writer<W>) -> csv::Result<()> {
        w.write_record(["Date", "Ticker", "Close"])?;
        for series in self.report.prices.iter() {
            for p in &series.points {
                w.write_record([
                    p.date.to_string(),
                    series.ticker.clone(),
                    self.format.cell(Some(p.close)),
                ])?;
            }
        }
        Ok(())
    }

    fn metrics<W: std::io::Write>(&self, w: &mut csv::Writer<W>) -> csv::Result<()> {
        w.write_record(self.format.metrics_header())?;
        for series in self.report.ordered_metrics() {
            for r in &series.rows {
                w.write_record([
                    r.date.to_string(),
                    series.ticker.clone(),
                    self.format.cell(Some(r.close)),
                    self.format.cell(r.pct_change),
                    self.format.cell(r.ma_short),
                    self.format.cell(r.ma_long),
                    self.format.cell(r.volatility),
                ])?;
            }
        }
        Ok(())
    }

    fn summary<W: std::io::Write>(&self, w: &mut csv::Writer<W>) -> csv::Result<()> {
        w.write_record(self.format.summary_header())?;
        for row in &self.report.summary {
            w.write_record([
                row.ticker.clone(),
                self.format.cell(row.total_return),
                self.format.cell(row.return_5d),
                self.format.cell(row.latest_volatility),
                self.format.cell(row.latest_close),
            ])?;
        }
        Ok(())
    }

    /// Title block, then the Date × ticker close pivot, then the summary block.
    fn dashboard<W: std::io::Write>(
        &self,
        w: &mut csv::Writer<W>,
        generated: NaiveDateTime,
    ) -> csv::Result<()> {
        w.write_record([DASHBOARD_TITLE])?;
        w.write_record([format!("Generated: {}", generated.format("%Y-%m-%d %H:%M"))])?;
        w.write_record([""])?;

        let (tickers, pivot) = self.pivot();
        let mut header = vec!["Date".to_string()];
        header.extend(tickers.iter().cloned());
        w.write_record(&header)?;
        for (date, closes) in pivot {
            let mut record = vec![date.to_string()];
            record.extend(closes.into_iter().map(|c| self.format.cell(c)));
            w.write_record(&record)?;
        }

        w.write_record([""])?;
        self.summary(w)
    }

    /// Union of dates across tickers with each ticker's close (or a gap).
    pub fn pivot(&self) -> (Vec<String>, Vec<(NaiveDate, Vec<Option<f64>>)>) {
        let tickers: Vec<String> = self.report.prices.tickers().map(str::to_string).collect();
        let lookups: Vec<HashMap<NaiveDate, f64>> = self
            .report
            .prices
            .iter()
            .map(|s| s.points.iter().map(|p| (p.date, p.close)).collect())
            .collect();

        let rows: Vec<(NaiveDate, Vec<Option<f64>>)> = self
            .report
            .prices
            .dates()
            .into_iter()
            .map(|date| (date, lookups.iter().map(|l| l.get(&date).copied()).collect()))
            .collect();
        (tickers, rows)
    }

    pub fn dashboard_text(&self, generated: NaiveDateTime) -> String {
        let mut out = format!(
            "{}\nGenerated: {}\n\n",
            DASHBOARD_TITLE,
            generated.format("%Y-%m-%d %H:%M")
        );
        if self.report.is_empty() {
            out.push_str("No price data.\n");
            return out;
        }
        out.push_str(&charts::trend_chart(self.report, CHART_WIDTH));
        out.push('\n');
        out.push_str(&charts::return_bars(&self.report.summary, CHART_WIDTH));
        out
    }
}
