use std::time::Instant;
use tracing::info;

/// Logs the start of a step and, on drop, how long it took.
pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        info!("⏱  Starting: {}", label);
        Self {
            label,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!(
            "⏱  Finished: {} (took {:.2?})",
            self.label,
            self.start.elapsed()
        );
    }
}

/// Format a count with thousands separators.
pub fn fmt_count(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, ch) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result
}

/// Fixed-precision cell value; not-available renders as an empty cell.
pub fn fmt_cell(v: Option<f64>, precision: usize) -> String {
    v.map(|v| format!("{:.*}", precision, v)).unwrap_or_default()
}

/// Signed percentage for console output, `—` when not available.
pub fn fmt_pct(v: Option<f64>) -> String {
    v.map(|v| format!("{:+.2}%", v * 100.0))
        .unwrap_or_else(|| "—".to_string())
}

pub fn fmt_price(v: Option<f64>) -> String {
    v.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "—".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_count() {
        assert_eq!(fmt_count(1_234_567), "1,234,567");
        assert_eq!(fmt_count(0), "0");
        assert_eq!(fmt_count(999), "999");
        assert_eq!(fmt_count(1000), "1,000");
    }

    #[test]
    fn test_fmt_cell() {
        assert_eq!(fmt_cell(Some(0.1), 4), "0.1000");
        assert_eq!(fmt_cell(Some(2.0 / 3.0), 6), "0.666667");
        assert_eq!(fmt_cell(None, 6), "");
    }

    #[test]
    fn test_fmt_pct() {
        assert_eq!(fmt_pct(Some(0.1)), "+10.00%");
        assert_eq!(fmt_pct(Some(-0.0625)), "-6.25%");
        assert_eq!(fmt_pct(None), "—");
    }
}
