use chrono::NaiveDate;
use thiserror::Error;

/// Failures of a single report recomputation.
///
/// A selection with no matching rows is not an error: it yields a series
/// made entirely of missing days.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("date range of {days} days exceeds the maximum of {max} days")]
    WindowTooLong { days: usize, max: usize },

    #[error("dataset is missing required column `{0}`")]
    MissingColumn(&'static str),

    #[error("could not parse date `{0}`")]
    InvalidDate(String),
}
