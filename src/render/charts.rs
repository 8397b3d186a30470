//! Plain-text charts for the dashboard and the `summary` command.

use crate::models::SummaryRow;
use crate::report::Report;
use crate::utils::fmt_pct;

const SPARKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Evenly spaced sample of at most `width` values, always keeping the last.
fn downsample(values: &[f64], width: usize) -> Vec<f64> {
    if width == 0 || values.len() <= width {
        return values.to_vec();
    }
    if width == 1 {
        return vec![values[values.len() - 1]];
    }
    let step = (values.len() - 1) as f64 / (width - 1) as f64;
    (0..width)
        .map(|i| values[((i as f64 * step).round() as usize).min(values.len() - 1)])
        .collect()
}

pub fn sparkline(values: &[f64], width: usize) -> String {
    let values = downsample(values, width);
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = hi - lo;
    values
        .iter()
        .map(|v| {
            if span <= 0.0 {
                SPARKS[SPARKS.len() / 2]
            } else {
                let idx = ((v - lo) / span * (SPARKS.len() - 1) as f64).round() as usize;
                SPARKS[idx.min(SPARKS.len() - 1)]
            }
        })
        .collect()
}

/// One sparkline per ticker: the closing-price trend over the period.
pub fn trend_chart(report: &Report, width: usize) -> String {
    let label = label_width(&report.summary);
    let mut out = String::from("Price Trend (Close)\n");
    for series in report.prices.iter() {
        let closes = series.closes();
        let (Some(first), Some(last)) = (closes.first(), closes.last()) else {
            continue;
        };
        out.push_str(&format!(
            "  {:<label$}  {}  {:.2} → {:.2}\n",
            series.ticker,
            sparkline(&closes, width),
            first,
            last,
        ));
    }
    out
}

/// Horizontal bars of total return, scaled to the largest magnitude.
pub fn return_bars(rows: &[SummaryRow], width: usize) -> String {
    let label = label_width(rows);
    let max = rows
        .iter()
        .filter_map(|r| r.total_return)
        .map(f64::abs)
        .fold(0.0, f64::max);

    let mut out = String::from("Total Return (Period)\n");
    for row in rows {
        let bar = match row.total_return {
            Some(r) if max > 0.0 => {
                let len = ((r.abs() / max) * width as f64).round() as usize;
                let fill = if r < 0.0 { '░' } else { '█' };
                std::iter::repeat_n(fill, len.max(1)).collect::<String>()
            }
            _ => String::new(),
        };
        out.push_str(&format!(
            "  {:<label$}  {:<width$}  {}\n",
            row.ticker,
            bar,
            fmt_pct(row.total_return),
        ));
    }
    out
}

fn label_width(rows: &[SummaryRow]) -> usize {
    rows.iter().map(|r| r.ticker.chars().count()).max().unwrap_or(0).max(6)
}
