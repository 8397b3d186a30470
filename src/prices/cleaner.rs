use crate::error::MalformedObservation;
use crate::models::{Observation, RawObservation};
use chrono::NaiveDate;

// ── Parsers ───────────────────────────────────────────────────────────────────

/// Parse price: drop currency sign, thousands separators and whitespace, then
/// the rest must be a plain float literal.
/// "$1,234.56" → 1234.56 | "1e-05" → 0.00001 | "12abc" → None
pub fn parse_price(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("n/a") || s == "-" || s == "—" {
        return None;
    }
    let cleaned: String = s
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse dates: ISO (optionally with a time suffix), US slashes, or "Feb 20, 2024".
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    // "2024-01-02 00:00:00-05:00", "2024-01-02T00:00:00Z"
    if s.len() > 10 && s.is_char_boundary(10) {
        let (head, tail) = s.split_at(10);
        if tail.starts_with(' ') || tail.starts_with('T') {
            if let Ok(d) = NaiveDate::parse_from_str(head, "%Y-%m-%d") {
                return Some(d);
            }
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%m/%d/%Y") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%b %d, %Y") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%d %b %Y") {
        return Some(d);
    }

    None
}

pub fn normalise_symbol(s: &str) -> String {
    s.trim().to_uppercase()
}

// ── Raw row → Observation ─────────────────────────────────────────────────────

pub fn clean_observation(raw: &RawObservation) -> Result<Observation, MalformedObservation> {
    let ticker = raw
        .ticker
        .as_deref()
        .map(normalise_symbol)
        .filter(|t| !t.is_empty())
        .ok_or(MalformedObservation::MissingTicker)?;

    let date_str = raw.date.as_deref().unwrap_or_default();
    let date = parse_date(date_str)
        .ok_or_else(|| MalformedObservation::BadDate(date_str.trim().to_string()))?;

    let close_str = raw.close.as_deref().unwrap_or_default();
    let close = parse_price(close_str)
        .ok_or_else(|| MalformedObservation::BadClose(close_str.trim().to_string()))?;

    if close <= 0.0 {
        return Err(MalformedObservation::NonPositiveClose(close));
    }

    Ok(Observation { date, ticker, close })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-01-02"), Some(ymd(2024, 1, 2)));
        assert_eq!(parse_date("2024-01-02 00:00:00-05:00"), Some(ymd(2024, 1, 2)));
        assert_eq!(parse_date("2024-01-02T14:30:00Z"), Some(ymd(2024, 1, 2)));
        assert_eq!(parse_date("01/02/2024"), Some(ymd(2024, 1, 2)));
        assert_eq!(parse_date("Feb 20, 2024"), Some(ymd(2024, 2, 20)));
        assert_eq!(parse_date("2024-13-01"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("$1,234.56"), Some(1234.56));
        assert_eq!(parse_price(" 610.00 "), Some(610.0));
        assert_eq!(parse_price("N/A"), None);
        assert_eq!(parse_price("nan"), None);
        assert_eq!(parse_price("inf"), None);
    }

    #[test]
    fn test_parse_price_scientific_and_junk() {
        assert_eq!(parse_price("1e-05"), Some(1e-5));
        assert_eq!(parse_price("1.5e+02"), Some(150.0));
        assert_eq!(parse_price("1.5e+20"), Some(1.5e20));
        assert_eq!(parse_price("12abc"), None);
        assert_eq!(parse_price("1.2.3"), None);
    }

    #[test]
    fn test_clean_observation_keeps_scientific_close() {
        let obs = clean_observation(&RawObservation::new("2024-01-02", "X", "1.5e+02")).unwrap();
        assert_eq!(obs.close, 150.0);

        let junk = RawObservation::new("2024-01-02", "X", "12abc");
        assert_eq!(
            clean_observation(&junk),
            Err(MalformedObservation::BadClose("12abc".into()))
        );
    }

    #[test]
    fn test_clean_observation_rejects() {
        let zero = RawObservation::new("2024-01-02", "aapl", "0");
        assert_eq!(
            clean_observation(&zero),
            Err(MalformedObservation::NonPositiveClose(0.0))
        );

        let bad_date = RawObservation::new("yesterday", "AAPL", "100");
        assert!(matches!(
            clean_observation(&bad_date),
            Err(MalformedObservation::BadDate(_))
        ));

        let no_ticker = RawObservation::new("2024-01-02", "  ", "100");
        assert_eq!(
            clean_observation(&no_ticker),
            Err(MalformedObservation::MissingTicker)
        );
    }

    #[test]
    fn test_clean_observation_normalises() {
        let raw = RawObservation::new(" 2024-01-02 ", " aapl ", "185.64");
        let obs = clean_observation(&raw).unwrap();
        assert_eq!(obs.ticker, "AAPL");
        assert_eq!(obs.date, ymd(2024, 1, 2));
        assert_eq!(obs.close, 185.64);
    }
}
