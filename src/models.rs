use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of an uploaded statement before normalisation: the file's header
/// names (lowercased, trimmed, in source order) plus this row's raw values.
#[derive(Debug, Clone)]
pub struct RawRecord {
    headers: Vec<String>,
    values: HashMap<String, String>,
}

impl RawRecord {
    pub fn new(headers: &[String], fields: &[String]) -> Self {
        let headers: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let mut values = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            let value = fields.get(i).map(|f| f.as_str()).unwrap_or("");
            // First occurrence wins when a file repeats a header name
            values
                .entry(header.clone())
                .or_insert_with(|| value.to_string());
        }
        Self { headers, values }
    }

    pub fn has(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    /// Trimmed value for a column name, if the column exists.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(|v| v.trim())
    }

    /// Header name at a source position, for positional fallbacks.
    pub fn header_at(&self, index: usize) -> Option<&str> {
        self.headers.get(index).map(|h| h.as_str())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Debit,
    Credit,
}

/// Normalised output of the statement parsers (bank-agnostic).
///
/// `amount` is always strictly positive; `direction` carries the sign
/// convention. `category` is filled in by the categoriser, never by parsers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub direction: Direction,
    pub source_file: String,
    pub category: Option<String>,
}

impl Transaction {
    pub fn is_debit(&self) -> bool {
        self.direction == Direction::Debit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_record_lowercases_and_trims_headers() {
        let rec = RawRecord::new(
            &[" Transaction ID ".into(), "Amount".into()],
            &["tx_1".into(), " -4.50 ".into()],
        );
        assert!(rec.has("transaction id"));
        assert_eq!(rec.get("amount"), Some("-4.50"));
        assert_eq!(rec.get("missing"), None);
    }

    #[test]
    fn test_raw_record_positional_header() {
        let rec = RawRecord::new(
            &["Date".into(), "Memo".into(), "Debit".into()],
            &["01/02/2024".into(), "COFFEE".into(), "2.80".into()],
        );
        assert_eq!(rec.header_at(1), Some("memo"));
        assert_eq!(rec.header_at(9), None);
        assert_eq!(rec.column_count(), 3);
    }

    #[test]
    fn test_raw_record_short_row_pads_empty() {
        let rec = RawRecord::new(
            &["date".into(), "description".into(), "amount".into()],
            &["01/02/2024".into()],
        );
        assert_eq!(rec.get("description"), Some(""));
        assert_eq!(rec.get("amount"), Some(""));
    }
}
