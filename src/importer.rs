//! Statement readers for the UK bank and credit-card formats we recognise.
//!
//! A statement file becomes a list of [`RawRecord`]s, then runs through an
//! ordered chain of provider parsers. Each parser decides applicability from
//! the column names of the first record alone; the first parser that both
//! matches and yields usable rows wins. A matching header with zero usable
//! rows falls through to the next parser, so a file cannot be "stolen" by a
//! format it merely resembles. When nothing matches, a column-guessing
//! generic parser has the last word.

use tracing::debug;

use crate::error::Result;
use crate::models::{Direction, RawRecord, Transaction};
use crate::normalize::{parse_amount, parse_date};

#[cfg(feature = "xlsx")]
use crate::error::PennyError;

// ---------------------------------------------------------------------------
// Record extraction
// ---------------------------------------------------------------------------

/// Read raw bytes into header-keyed records. Spreadsheets go through
/// calamine; anything else is treated as delimited text.
pub fn extract_records(bytes: &[u8], filename: &str) -> Result<Vec<RawRecord>> {
    let lower = filename.to_lowercase();
    if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
        return records_from_workbook(bytes);
    }
    records_from_text(&decode_text(bytes))
}

/// UTF-8 first; Latin-1 decodes any byte sequence, which covers the cp1252
/// exports some banks still produce.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

const CANDIDATE_DELIMITERS: &[char] = &[',', ';', '\t'];

/// Find the header line and the delimiter. Statements often carry leading
/// noise (account metadata, blank lines); the header is the first line with
/// at least two separator characters.
fn sniff_header(lines: &[&str]) -> Option<(usize, u8)> {
    for (index, line) in lines.iter().enumerate() {
        let best = CANDIDATE_DELIMITERS
            .iter()
            .map(|&d| (d, line.matches(d).count()))
            .max_by_key(|&(_, count)| count)?;
        if best.1 >= 2 {
            return Some((index, best.0 as u8));
        }
    }
    None
}

fn records_from_text(text: &str) -> Result<Vec<RawRecord>> {
    let lines: Vec<&str> = text.lines().collect();
    let Some((start, delimiter)) = sniff_header(&lines) else {
        return Ok(Vec::new());
    };
    let body = lines[start..].join("\n");

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(body.as_bytes());

    let mut headers: Option<Vec<String>> = None;
    let mut records = Vec::new();
    for result in rdr.records() {
        let Ok(record) = result else { continue };
        let fields: Vec<String> = record.iter().map(|f| f.to_string()).collect();
        match &headers {
            None => headers = Some(fields),
            Some(headers) => {
                if fields.iter().all(|f| f.trim().is_empty()) {
                    continue;
                }
                records.push(RawRecord::new(headers, &fields));
            }
        }
    }
    Ok(records)
}

#[cfg(feature = "xlsx")]
fn records_from_workbook(bytes: &[u8]) -> Result<Vec<RawRecord>> {
    use calamine::{Data, Reader};

    let cursor = std::io::Cursor::new(bytes.to_vec());
    let mut workbook = calamine::open_workbook_auto_from_rs(cursor)
        .map_err(|e| PennyError::Spreadsheet(e.to_string()))?;
    let Some(sheet) = workbook.sheet_names().first().cloned() else {
        return Ok(Vec::new());
    };
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| PennyError::Spreadsheet(e.to_string()))?;

    let cell_to_string = |cell: &Data| -> String {
        match cell {
            Data::String(s) => s.trim().to_string(),
            Data::Float(f) => {
                if f.fract() == 0.0 {
                    format!("{}", *f as i64)
                } else {
                    f.to_string()
                }
            }
            Data::Int(i) => i.to_string(),
            Data::Bool(b) => b.to_string(),
            Data::DateTime(dt) => crate::normalize::excel_serial_to_date(dt.as_f64())
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            _ => String::new(),
        }
    };

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row.iter().map(cell_to_string).collect();

    let mut records = Vec::new();
    for row in rows {
        let fields: Vec<String> = row.iter().map(cell_to_string).collect();
        if fields.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        records.push(RawRecord::new(&headers, &fields));
    }
    Ok(records)
}

#[cfg(not(feature = "xlsx"))]
fn records_from_workbook(_bytes: &[u8]) -> Result<Vec<RawRecord>> {
    Err(crate::error::PennyError::Spreadsheet(
        "built without the xlsx feature".to_string(),
    ))
}

// ---------------------------------------------------------------------------
// Row assembly helpers
// ---------------------------------------------------------------------------

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Assemble one normalised transaction, or drop the row: no parseable date,
/// or a zero amount after rounding, means the row never existed.
fn build_row(
    date_raw: Option<&str>,
    description: &str,
    magnitude: f64,
    direction: Direction,
    source: &str,
) -> Option<Transaction> {
    let date = parse_date(date_raw?).ok()?;
    let amount = round2(magnitude.abs());
    if amount <= 0.0 {
        return None;
    }
    Some(Transaction {
        date,
        description: description.trim().to_string(),
        amount,
        direction,
        source_file: source.to_string(),
        category: None,
    })
}

/// Sign convention shared by Monzo, Starling, Revolut and the generic
/// parser: negative is money out, positive is money in.
fn direction_from_sign(signed: f64) -> Option<Direction> {
    if signed < 0.0 {
        Some(Direction::Debit)
    } else if signed > 0.0 {
        Some(Direction::Credit)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Provider parsers — enum dispatch, fixed trial order
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    AmexDetailed,
    Monzo,
    Starling,
    Revolut,
    Lloyds,
    Hsbc,
    AmexSimple,
}

/// Trial order is load-bearing: Monzo's `transaction id` must be tested
/// before HSBC's `debit`/`credit` pair, and the simple Amex shape comes
/// last because richer formats also carry `amount` and `description`.
pub const PARSER_CHAIN: &[ParserKind] = &[
    ParserKind::AmexDetailed,
    ParserKind::Monzo,
    ParserKind::Starling,
    ParserKind::Revolut,
    ParserKind::Lloyds,
    ParserKind::Hsbc,
    ParserKind::AmexSimple,
];

impl ParserKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::AmexDetailed => "amex_detailed",
            Self::Monzo => "monzo",
            Self::Starling => "starling",
            Self::Revolut => "revolut",
            Self::Lloyds => "lloyds_halifax",
            Self::Hsbc => "hsbc",
            Self::AmexSimple => "amex_simple",
        }
    }

    /// Column-name presence on the first record decides applicability;
    /// nothing else is sniffed.
    pub fn detect(&self, header: &RawRecord) -> bool {
        match self {
            Self::AmexDetailed => {
                header.has("billing amount")
                    && header.has("merchant")
                    && header.has("debit or credit")
            }
            Self::Monzo => header.has("transaction id"),
            Self::Starling => header.has("counter party") || header.has("counterparty"),
            Self::Revolut => header.has("completed date") || header.has("started date"),
            Self::Lloyds => header.has("transaction description") && header.has("debit amount"),
            Self::Hsbc => header.has("debit") && header.has("credit"),
            Self::AmexSimple => {
                header.has("amount") && header.has("description") && header.column_count() <= 6
            }
        }
    }

    pub fn parse(&self, records: &[RawRecord], source: &str) -> Vec<Transaction> {
        if records.is_empty() {
            return Vec::new();
        }
        match self {
            Self::AmexDetailed => parse_amex_detailed(records, source),
            Self::Monzo => parse_monzo(records, source),
            Self::Starling => parse_starling(records, source),
            Self::Revolut => parse_revolut(records, source),
            Self::Lloyds => parse_lloyds(records, source),
            Self::Hsbc => parse_hsbc(records, source),
            Self::AmexSimple => parse_amex_simple(records, source),
        }
    }
}

/// Amex detailed export: Transaction Date, Billing Amount, Merchant,
/// Debit or Credit (DBIT/CRDT flag).
fn parse_amex_detailed(records: &[RawRecord], source: &str) -> Vec<Transaction> {
    let date_col = if records[0].has("transaction date") {
        "transaction date"
    } else {
        "posting date"
    };
    records
        .iter()
        .filter_map(|rec| {
            let direction = match rec.get("debit or credit") {
                Some(flag) if flag.eq_ignore_ascii_case("CRDT") => Direction::Credit,
                _ => Direction::Debit,
            };
            let amount = parse_amount(rec.get("billing amount")?).ok()?;
            build_row(
                rec.get(date_col),
                rec.get("merchant").unwrap_or(""),
                amount,
                direction,
                source,
            )
        })
        .collect()
}

/// Monzo: negative amounts are spend. The description is a composite of
/// name, raw description and type so the categoriser has more to match on;
/// duplicate parts are skipped case-insensitively.
fn parse_monzo(records: &[RawRecord], source: &str) -> Vec<Transaction> {
    records
        .iter()
        .filter_map(|rec| {
            let mut parts: Vec<&str> = Vec::new();
            for col in ["name", "description", "type"] {
                if let Some(value) = rec.get(col) {
                    if !value.is_empty()
                        && !parts.iter().any(|p| p.eq_ignore_ascii_case(value))
                    {
                        parts.push(value);
                    }
                }
            }
            let description = parts.join(crate::categorizer::COMPOSITE_DELIMITER);
            let signed = parse_amount(rec.get("amount")?).ok()?;
            let direction = direction_from_sign(signed)?;
            build_row(rec.get("date"), &description, signed, direction, source)
        })
        .collect()
}

/// Starling: Counter Party + Reference make the description; the amount
/// column is found by best-effort name match since exports vary between
/// "Amount (GBP)" and plain "Amount".
fn parse_starling(records: &[RawRecord], source: &str) -> Vec<Transaction> {
    let header = &records[0];
    let cp_col = if header.has("counter party") {
        "counter party"
    } else {
        "counterparty"
    };
    let amount_col = header
        .headers()
        .iter()
        .find(|h| h.contains("amount") && h.contains("gbp"))
        .or_else(|| header.headers().iter().find(|h| h.contains("amount")))
        .cloned()
        .unwrap_or_else(|| "amount".to_string());

    records
        .iter()
        .filter_map(|rec| {
            let counterparty = rec.get(cp_col).unwrap_or("");
            let reference = rec.get("reference").unwrap_or("");
            let description = format!("{counterparty} {reference}");
            let signed = parse_amount(rec.get(&amount_col)?).ok()?;
            let direction = direction_from_sign(signed)?;
            build_row(rec.get("date"), &description, signed, direction, source)
        })
        .collect()
}

/// Revolut: Completed Date preferred over Started Date (pending rows only
/// have the latter).
fn parse_revolut(records: &[RawRecord], source: &str) -> Vec<Transaction> {
    let date_col = if records[0].has("completed date") {
        "completed date"
    } else {
        "started date"
    };
    records
        .iter()
        .filter_map(|rec| {
            let signed = parse_amount(rec.get("amount")?).ok()?;
            let direction = direction_from_sign(signed)?;
            build_row(
                rec.get(date_col),
                rec.get("description").unwrap_or(""),
                signed,
                direction,
                source,
            )
        })
        .collect()
}

/// Lloyds/Halifax: separate Debit Amount and Credit Amount columns, each
/// driving its own branch. A row with neither populated is dropped.
fn parse_lloyds(records: &[RawRecord], source: &str) -> Vec<Transaction> {
    records
        .iter()
        .filter_map(|rec| {
            let description = rec.get("transaction description").unwrap_or("");
            let date_raw = rec.get("transaction date");
            let debit = rec
                .get("debit amount")
                .and_then(|v| parse_amount(v).ok())
                .unwrap_or(0.0);
            if debit > 0.0 {
                return build_row(date_raw, description, debit, Direction::Debit, source);
            }
            let credit = rec
                .get("credit amount")
                .and_then(|v| parse_amount(v).ok())
                .unwrap_or(0.0);
            if credit > 0.0 {
                return build_row(date_raw, description, credit, Direction::Credit, source);
            }
            None
        })
        .collect()
}

/// HSBC: Debit and Credit columns; the description column is `Description`
/// when present, otherwise whatever sits second in the file.
fn parse_hsbc(records: &[RawRecord], source: &str) -> Vec<Transaction> {
    let desc_col = if records[0].has("description") {
        "description".to_string()
    } else {
        records[0].header_at(1).unwrap_or_default().to_string()
    };
    records
        .iter()
        .filter_map(|rec| {
            let description = rec.get(&desc_col).unwrap_or("");
            let date_raw = rec.get("date");
            let debit = rec
                .get("debit")
                .and_then(|v| parse_amount(v).ok())
                .unwrap_or(0.0);
            if debit > 0.0 {
                return build_row(date_raw, description, debit, Direction::Debit, source);
            }
            let credit = rec
                .get("credit")
                .and_then(|v| parse_amount(v).ok())
                .unwrap_or(0.0);
            if credit > 0.0 {
                return build_row(date_raw, description, credit, Direction::Credit, source);
            }
            None
        })
        .collect()
}

/// Simple Amex export: Date, Description, Amount with the inverted sign
/// convention — positive is a charge, negative a refund.
fn parse_amex_simple(records: &[RawRecord], source: &str) -> Vec<Transaction> {
    records
        .iter()
        .filter_map(|rec| {
            let signed = parse_amount(rec.get("amount")?).ok()?;
            let direction = if signed > 0.0 {
                Direction::Debit
            } else if signed < 0.0 {
                Direction::Credit
            } else {
                return None;
            };
            build_row(
                rec.get("date"),
                rec.get("description").unwrap_or(""),
                signed,
                direction,
                source,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Generic fallback
// ---------------------------------------------------------------------------

const DATE_CANDIDATES: &[&str] = &[
    "date",
    "transaction date",
    "trans date",
    "posted date",
    "value date",
];

const DESCRIPTION_CANDIDATES: &[&str] = &[
    "description",
    "transaction description",
    "narrative",
    "details",
    "memo",
    "name",
    "payee",
    "merchant",
];

const AMOUNT_CANDIDATES: &[&str] = &[
    "amount",
    "debit",
    "debit amount",
    "value",
    "transaction amount",
];

fn pick_column(
    header: &RawRecord,
    exact: &[&str],
    substrings: &[&str],
    positional: Option<usize>,
) -> Option<String> {
    if let Some(name) = exact.iter().copied().find(|c| header.has(c)) {
        return Some(name.to_string());
    }
    if let Some(name) = header
        .headers()
        .iter()
        .find(|h| substrings.iter().any(|s| h.contains(s)))
    {
        return Some(name.clone());
    }
    positional.and_then(|i| header.header_at(i)).map(String::from)
}

/// Best-effort parser for unknown layouts: guess the date, description and
/// amount columns by name, then fall back to fixed positions.
pub fn parse_generic(records: &[RawRecord], source: &str) -> Vec<Transaction> {
    let Some(header) = records.first() else {
        return Vec::new();
    };
    let Some(date_col) = pick_column(header, DATE_CANDIDATES, &["date"], Some(0)) else {
        return Vec::new();
    };
    let desc_col = pick_column(
        header,
        DESCRIPTION_CANDIDATES,
        &["desc", "narr", "detail", "memo"],
        Some(if header.column_count() > 1 { 1 } else { 0 }),
    )
    .unwrap_or_else(|| date_col.clone());
    let amount_col = pick_column(
        header,
        AMOUNT_CANDIDATES,
        &["amount", "debit", "value"],
        header.column_count().checked_sub(1),
    )
    .unwrap_or_else(|| date_col.clone());

    records
        .iter()
        .filter_map(|rec| {
            let signed = parse_amount(rec.get(&amount_col)?).ok()?;
            let direction = direction_from_sign(signed)?;
            build_row(
                rec.get(&date_col),
                rec.get(&desc_col).unwrap_or(""),
                signed,
                direction,
                source,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Parse one statement file into normalised transactions.
///
/// Providers are tried in [`PARSER_CHAIN`] order; the first that matches the
/// header and produces at least one row wins. Everything else lands in the
/// generic parser, which may legitimately return nothing.
pub fn parse_statement(bytes: &[u8], filename: &str) -> Result<Vec<Transaction>> {
    let records = extract_records(bytes, filename)?;
    if records.is_empty() {
        return Ok(Vec::new());
    }
    for kind in PARSER_CHAIN {
        if kind.detect(&records[0]) {
            let rows = kind.parse(&records, filename);
            if !rows.is_empty() {
                debug!("parsed {} as {} ({} rows)", filename, kind.key(), rows.len());
                return Ok(rows);
            }
        }
    }
    let rows = parse_generic(&records, filename);
    debug!("parsed {} generically ({} rows)", filename, rows.len());
    Ok(rows)
}
