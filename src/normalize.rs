//! Pure helpers that turn raw statement strings into canonical values.

use chrono::{Datelike, NaiveDate};

use crate::error::{PennyError, Result};

/// Parse a currency-formatted amount string into a signed decimal.
///
/// Strips thousands separators, currency symbols and stray quotes, and
/// accepts accounting-style parenthesized negatives: "(50.00)" -> -50.0.
pub fn parse_amount(raw: &str) -> Result<f64> {
    let s = raw
        .replace(',', "")
        .replace('"', "")
        .replace('£', "")
        .replace('$', "")
        .replace('€', "");
    let s = s.trim();
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        let value: f64 = inner
            .trim()
            .parse()
            .map_err(|_| PennyError::NotANumber(raw.to_string()))?;
        return Ok(-value);
    }
    if s.is_empty() {
        return Err(PennyError::NotANumber(raw.to_string()));
    }
    s.parse()
        .map_err(|_| PennyError::NotANumber(raw.to_string()))
}

// Day-first shapes are tried before month-first, so an ambiguous NN/NN/YYYY
// always resolves day-first. US-formatted files without a locale hint will
// misparse; that limitation is deliberate (see DESIGN.md).
const DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%Y-%m-%d",
    "%d %b %Y",
    "%d/%m/%y",
    "%m/%d/%Y",
];

// Lenient second pass for shapes the explicit list misses.
const FALLBACK_FORMATS: &[&str] = &[
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%m/%d/%y",
];

/// Parse a statement date string, trying the explicit UK-first pattern list
/// before a lenient fallback pass.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let full = raw.trim();
    // Some exports append a time component; the bare date token parses first
    let token = full.split_whitespace().next().unwrap_or(full);
    for candidate in [token, full] {
        for fmt in DATE_FORMATS.iter().chain(FALLBACK_FORMATS) {
            if let Ok(date) = NaiveDate::parse_from_str(candidate, fmt) {
                // chrono's %Y accepts a two-digit year, which would shadow
                // the %d/%m/%y pattern with year 0024-style dates
                if date.year() >= 1000 {
                    return Ok(date);
                }
            }
        }
    }
    Err(PennyError::UnrecognizedDate(raw.to_string()))
}

/// Convert an Excel serial date to a calendar date.
///
/// Excel's epoch is 1899-12-30, accounting for the 1900 leap year bug.
#[cfg(feature = "xlsx")]
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(chrono::Duration::days(serial as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_plain() {
        assert_eq!(parse_amount("1234.56").unwrap(), 1234.56);
        assert_eq!(parse_amount("  -42.50  ").unwrap(), -42.5);
        assert_eq!(parse_amount("0").unwrap(), 0.0);
    }

    #[test]
    fn test_parse_amount_currency_and_separators() {
        assert_eq!(parse_amount("£1,234.56").unwrap(), 1234.56);
        assert_eq!(parse_amount("$1,234.56").unwrap(), 1234.56);
        assert_eq!(parse_amount("€99.00").unwrap(), 99.0);
        assert_eq!(parse_amount("\"2,000.00\"").unwrap(), 2000.0);
        assert_eq!(parse_amount("-£50.00").unwrap(), -50.0);
    }

    #[test]
    fn test_parse_amount_parenthesized_negatives() {
        assert_eq!(parse_amount("(500.00)").unwrap(), -500.0);
        assert_eq!(parse_amount("(1,234.56)").unwrap(), -1234.56);
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert!(parse_amount("").is_err());
        assert!(parse_amount("   ").is_err());
        assert!(parse_amount("not_a_number").is_err());
        assert!(parse_amount("12.3.4").is_err());
    }

    #[test]
    fn test_parse_date_uk_shapes() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(parse_date("31/01/2024").unwrap(), expected);
        assert_eq!(parse_date("31-01-2024").unwrap(), expected);
        assert_eq!(parse_date("2024-01-31").unwrap(), expected);
        assert_eq!(parse_date("31 Jan 2024").unwrap(), expected);
        assert_eq!(parse_date("31/01/24").unwrap(), expected);
    }

    #[test]
    fn test_parse_date_day_first_wins_when_ambiguous() {
        // 01/02/2024 is 1 February, not 2 January
        assert_eq!(
            parse_date("01/02/2024").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );
    }

    #[test]
    fn test_parse_date_month_first_only_when_day_first_impossible() {
        // Day 13 can't be a month, so the %m/%d/%Y pattern catches it
        assert_eq!(
            parse_date("12/25/2024").unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 25).unwrap()
        );
    }

    #[test]
    fn test_parse_date_strips_time_component() {
        assert_eq!(
            parse_date("2024-01-31 14:22:05").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
        );
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("").is_err());
        assert!(parse_date("yesterday").is_err());
        assert!(parse_date("32/01/2024").is_err());
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(
            excel_serial_to_date(45667.0).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()
        );
    }
}
