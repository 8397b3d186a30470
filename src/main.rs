mod config;
mod error;
mod fetcher;
mod loader;
mod metrics;
mod models;
mod pipeline;
mod prices;
mod render;
mod report;
mod summary;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::AppConfig;
use crate::fetcher::YahooChartSource;
use crate::pipeline::Pipeline;
use crate::render::charts;

#[derive(Parser)]
#[command(name = "market-insights", about = "Daily price metrics and dashboard builder", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Comma-separated tickers; also fixes the report order
    #[arg(short, long, value_delimiter = ',', global = true, env = "MARKET_TICKERS")]
    tickers: Option<Vec<String>>,

    /// Directory holding per-ticker price CSVs
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory the report sheets are written to
    #[arg(long, global = true)]
    out_dir: Option<PathBuf>,

    /// History range to download (e.g. 1mo, 3mo, 6mo, 1y, max)
    #[arg(long, global = true)]
    range: Option<String>,

    /// Bar interval to download (e.g. 1d, 1wk)
    #[arg(long, global = true)]
    interval: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Download price history and save one CSV per ticker
    Fetch,

    /// Rebuild the report from the CSVs in the data directory
    Build,

    /// Fetch, then build (one-shot / scheduled use)
    Run,

    /// Print the summary table and charts without writing files
    Summary,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(tickers) = &self.tickers {
            config.analysis.tickers = tickers
                .iter()
                .map(|t| t.trim().to_uppercase())
                .filter(|t| !t.is_empty())
                .collect();
        }
        if let Some(dir) = &self.data_dir {
            config.data.data_dir = dir.clone();
        }
        if let Some(dir) = &self.out_dir {
            config.data.output_dir = dir.clone();
        }
        if let Some(range) = &self.range {
            config.fetch.range = range.clone();
        }
        if let Some(interval) = &self.interval {
            config.fetch.interval = interval.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "market_insights=info,warn",
        1 => "market_insights=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let mut config = AppConfig::load()?;
    cli.apply(&mut config);
    config.analysis.validate()?;

    match cli.command {
        Command::Fetch => {
            let _t = utils::Timer::start("Price fetch");
            let source = Arc::new(YahooChartSource::new(&config.fetch)?);
            let stats = Pipeline::new(config).fetch(source).await?;
            info!("Done: {} tickers, {} bars, {} errors", stats.tickers, stats.bars, stats.errors);
        }

        Command::Build => {
            let _t = utils::Timer::start("Report build");
            let out_dir = config.data.output_dir.clone();
            let stats = Pipeline::new(config).build().await?;
            info!("Done: {} tickers, {} skipped rows → {:?}", stats.tickers, stats.skipped_rows, out_dir);
        }

        Command::Run => {
            let _t = utils::Timer::start("Fetch and build");
            let source = Arc::new(YahooChartSource::new(&config.fetch)?);
            let out_dir = config.data.output_dir.clone();
            let pipeline = Pipeline::new(config);
            pipeline.fetch(source).await?;
            let stats = pipeline.build().await?;
            info!("Done: {} tickers → {:?}", stats.tickers, out_dir);
        }

        Command::Summary => {
            let (analysis, _) = Pipeline::new(config).analyze().await?;
            let report = &analysis.report;
            if report.is_empty() {
                println!("No price data — run `market-insights fetch` first.");
                return Ok(());
            }

            println!("──────────────────────────────────────────────────────────────");
            println!(
                "  {:<8} {:>10} {:>10} {:>10} {:>10} {:>6}",
                "Ticker", "Last", "Total", "5D", "Vol", "Days"
            );
            println!("──────────────────────────────────────────────────────────────");
            for row in &report.summary {
                let days = report.prices.get(&row.ticker).map(|s| s.len()).unwrap_or(0);
                println!(
                    "  {:<8} {:>10} {:>10} {:>10} {:>10} {:>6}",
                    row.ticker,
                    utils::fmt_price(row.latest_close),
                    utils::fmt_pct(row.total_return),
                    utils::fmt_pct(row.return_5d),
                    utils::fmt_pct(row.latest_volatility),
                    utils::fmt_count(days),
                );
            }
            println!("──────────────────────────────────────────────────────────────");
            println!(
                "  {} rows, {} skipped",
                utils::fmt_count(report.prices.row_count()),
                utils::fmt_count(analysis.diagnostics.len())
            );
            println!();
            print!("{}", charts::trend_chart(report, 40));
            println!();
            print!("{}", charts::return_bars(&report.summary, 40));
        }
    }

    Ok(())
}
