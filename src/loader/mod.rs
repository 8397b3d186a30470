//! CSV loader for per-ticker price files (`Date,Ticker,Close`).

use crate::models::RawObservation;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Rows read from one or more CSV files, in file then line order.
#[derive(Debug, Default)]
pub struct LoadedRows {
    pub rows: Vec<RawObservation>,
    pub files: usize,
    pub skipped_files: usize,
    /// Records the CSV reader itself could not decode.
    pub unreadable: usize,
}

/// Extract symbol from CSV filename. `aapl_1y.csv` → `AAPL`
pub fn extract_symbol_from_filename(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let symbol = stem
        .split(|c: char| c == '_' || c == ' ')
        .next()?
        .trim()
        .to_uppercase();

    if symbol.is_empty() { None } else { Some(symbol) }
}

struct Columns {
    date: usize,
    ticker: Option<usize>,
    close: usize,
}

fn locate_columns(headers: &csv::StringRecord) -> Option<Columns> {
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };
    Some(Columns {
        date: find("date").or_else(|| find("datetime"))?,
        ticker: find("ticker").or_else(|| find("symbol")),
        close: find("close").or_else(|| find("adj close"))?,
    })
}

/// Read one price CSV. Returns `None` when the file lacks a date or close
/// column. Without a ticker column the symbol comes from the file name.
pub fn load_csv(path: &Path) -> Result<Option<LoadedRows>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {:?}", path))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {:?}", path))?
        .clone();

    let Some(cols) = locate_columns(&headers) else {
        warn!("{:?}: no Date/Close columns, skipping file", path);
        return Ok(None);
    };

    let fallback_symbol = extract_symbol_from_filename(path);
    if cols.ticker.is_none() && fallback_symbol.is_none() {
        warn!("{:?}: no Ticker column and no symbol in filename, skipping file", path);
        return Ok(None);
    }

    let mut loaded = LoadedRows {
        files: 1,
        ..LoadedRows::default()
    };

    for result in reader.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("{:?}: unreadable record: {}", path, e);
                loaded.unreadable += 1;
                continue;
            }
        };
        let origin = record
            .position()
            .map(|pos| format!("{}:{}", path.display(), pos.line()));

        let ticker = cols
            .ticker
            .and_then(|idx| record.get(idx))
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .or_else(|| fallback_symbol.clone());

        loaded.rows.push(RawObservation {
            date: record.get(cols.date).map(str::to_string),
            ticker,
            close: record.get(cols.close).map(str::to_string),
            origin,
        });
    }

    debug!("{:?}: {} rows", path, loaded.rows.len());
    Ok(Some(loaded))
}

/// CSV files directly inside `dir`, sorted by name. Missing dir → empty.
pub fn discover_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(vec![]);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to list {:?}", dir))? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load every price CSV in `dir`.
pub fn load_dir(dir: &Path) -> Result<LoadedRows> {
    let files = discover_csv_files(dir)?;
    info!("Found {} CSV files in {:?}", files.len(), dir);

    let mut all = LoadedRows::default();
    for path in &files {
        match load_csv(path)? {
            Some(batch) => {
                all.files += batch.files;
                all.unreadable += batch.unreadable;
                all.rows.extend(batch.rows);
            }
            None => all.skipped_files += 1,
        }
    }
    Ok(all)
}
