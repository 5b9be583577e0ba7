//! Calendar completion and x-axis label derivation.
//!
//! Both operations work on plain dates and know nothing about stores or
//! counts, so they are shared by every chart in a report.

use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::BTreeSet;

use crate::error::ReportError;
use crate::types::{AxisLabel, MonthAnnotation};

/// Public holidays observed by the stores, (month, day) in 2024
const KENYA_HOLIDAYS_2024: &[(u32, u32)] = &[
    (1, 1),   // New Year's Day
    (3, 29),  // Good Friday
    (4, 1),   // Easter Monday
    (4, 10),  // Idd-ul-Fitr
    (5, 1),   // Labour Day
    (6, 1),   // Madaraka Day
    (6, 17),  // Idd-ul-Adha
    (10, 10), // Mazingira Day
    (10, 20), // Mashujaa Day
    (10, 21), // Mashujaa Day (observed)
    (12, 12), // Jamhuri Day
    (12, 25), // Christmas Day
    (12, 26), // Boxing Day
];

/// Set of dates rendered as emphasized ticks in addition to weekends
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidayCalendar {
    dates: BTreeSet<NaiveDate>,
}

impl HolidayCalendar {
    pub fn new(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            dates: dates.into_iter().collect(),
        }
    }

    /// The fixed 2024 public holiday list
    pub fn kenya_2024() -> Self {
        Self::new(
            KENYA_HOLIDAYS_2024
                .iter()
                .filter_map(|&(m, d)| NaiveDate::from_ymd_opt(2024, m, d)),
        )
    }

    /// Add extra dates, e.g. one-off closures from configuration
    pub fn with_extra(mut self, extra: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.dates.extend(extra);
        self
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }
}

/// Every calendar day from `start` to `end`, both included, ascending
pub fn complete(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>, ReportError> {
    if start > end {
        return Err(ReportError::InvalidRange { start, end });
    }
    Ok(start.iter_days().take_while(|d| *d <= end).collect())
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Derive tick labels and month annotations for a run of dates.
///
/// Months are grouped by consecutive (year, month) so the same month in two
/// different years yields two annotations. Each annotation is anchored at
/// the middle day of its run, rounding towards the start.
pub fn labels(
    dates: &[NaiveDate],
    holidays: &HolidayCalendar,
) -> (Vec<AxisLabel>, Vec<MonthAnnotation>) {
    let axis = dates
        .iter()
        .map(|&date| AxisLabel {
            date,
            text: date.format("%d").to_string(),
            emphasized: is_weekend(date) || holidays.contains(date),
        })
        .collect();

    let mut months = Vec::new();
    let mut offset = 0;
    for run in dates.chunk_by(|a, b| month_key(*a) == month_key(*b)) {
        let anchor = dates[offset + (run.len() - 1) / 2];
        months.push(MonthAnnotation {
            anchor_date: anchor,
            text: anchor.format("%b").to_string(),
        });
        offset += run.len();
    }

    (axis, months)
}

fn month_key(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}
