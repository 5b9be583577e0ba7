use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::ReportError;
use crate::types::RawObservation;

/// Date layouts accepted in the `Date` column, tried in order
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parse a foot-count CSV export.
///
/// The file needs a header row with `Store` (or `Store Name`), `Date` and
/// `Foot Count` (or `Count`) columns, in any case, with spaces, dashes or
/// underscores ignored. Rows whose date or count cannot be
/// read are skipped with a warning.
pub fn parse_csv(path: &Path) -> Result<Vec<RawObservation>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    parse_csv_reader(file).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Parse CSV content from any reader
pub fn parse_csv_reader<R: Read>(reader: R) -> Result<Vec<RawObservation>> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers().context("Failed to read header row")?.clone();
    let columns = map_columns(&headers);
    let store_col = required(&columns, "store", "Store")?;
    let date_col = required(&columns, "date", "Date")?;
    let count_col = required(&columns, "count", "Foot Count")?;

    let mut observations = Vec::new();
    let mut skipped = 0usize;

    for (idx, record) in reader.records().enumerate() {
        // Header is line 1
        let line = idx + 2;
        let record = record.with_context(|| format!("Malformed CSV record at line {line}"))?;

        match parse_row(&record, store_col, date_col, count_col) {
            Some(obs) => observations.push(obs),
            None => {
                warn!(line, record = ?record, "Skipping unreadable row");
                skipped += 1;
            }
        }
    }

    debug!(rows = observations.len(), skipped, "Parsed CSV");
    Ok(observations)
}

fn required(
    columns: &HashMap<&'static str, usize>,
    key: &str,
    column: &'static str,
) -> Result<usize> {
    columns
        .get(key)
        .copied()
        .ok_or_else(|| ReportError::MissingColumn(column).into())
}

/// Normalized header names accepted for each column
const COLUMN_ALIASES: &[(&str, &[&str])] = &[
    ("store", &["store", "storename"]),
    ("date", &["date"]),
    ("count", &["footcount", "count"]),
];

/// Map header names to column indices. The first matching column wins.
fn map_columns(headers: &StringRecord) -> HashMap<&'static str, usize> {
    let mut indices = HashMap::new();

    for (i, header) in headers.iter().enumerate() {
        let key = normalize_header(header);
        for &(column, aliases) in COLUMN_ALIASES {
            if aliases.contains(&key.as_str()) {
                indices.entry(column).or_insert(i);
            }
        }
    }

    indices
}

fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn parse_row(
    record: &StringRecord,
    store_col: usize,
    date_col: usize,
    count_col: usize,
) -> Option<RawObservation> {
    let store = record.get(store_col)?;
    if store.is_empty() {
        return None;
    }
    let date = parse_date(record.get(date_col)?)?;
    let count = parse_count(record.get(count_col).unwrap_or(""))?;

    Some(RawObservation::new(store, date, count))
}

/// Parse a calendar date, ignoring any time-of-day suffix
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let date_part = value
        .split(|c: char| c.is_whitespace() || c == 'T')
        .next()
        .unwrap_or(value);

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

/// Parse a foot count cell.
///
/// `Some(None)` is an empty cell, `None` is a value that is not a
/// non-negative whole number.
fn parse_count(value: &str) -> Option<Option<u32>> {
    if value.is_empty() || value.eq_ignore_ascii_case("nan") {
        return Some(None);
    }
    if let Ok(n) = value.parse::<u32>() {
        return Some(Some(n));
    }

    // Exports with blank cells write whole numbers as floats ("50.0")
    let f = value.parse::<f64>().ok()?;
    if f.fract() == 0.0 && f >= 0.0 && f <= f64::from(u32::MAX) {
        Some(Some(f as u32))
    } else {
        None
    }
}
