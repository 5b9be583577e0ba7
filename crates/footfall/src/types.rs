use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::error::ReportError;

/// A single recorded foot count for one store on one day
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct RawObservation {
    /// Store identifier as it appears in the dataset
    pub store: String,

    /// Calendar day of the observation
    pub date: NaiveDate,

    /// People counted on that day, if recorded
    #[serde(rename = "foot_count")]
    pub count: Option<u32>,
}

impl RawObservation {
    pub fn new(store: impl Into<String>, date: NaiveDate, count: Option<u32>) -> Self {
        Self {
            store: store.into(),
            date,
            count,
        }
    }
}

/// Inclusive range of days selected for display
#[derive(Debug, Clone, Copy, Serialize, Eq, PartialEq)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    /// Create a window, rejecting a start that falls after the end
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ReportError> {
        if start > end {
            return Err(ReportError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Trailing window of `days` days that ends the day before `today`.
    /// A zero length is treated as one day.
    pub fn trailing(today: NaiveDate, days: u32) -> Self {
        let end = today.pred_opt().unwrap_or(today);
        let span = i64::from(days.max(1) - 1);
        let start = end
            .checked_sub_signed(chrono::Duration::days(span))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered, both ends included
    pub fn len(&self) -> usize {
        ((self.end - self.start).num_days() + 1) as usize
    }

    /// Every day in the window in ascending order
    pub fn days(&self) -> Vec<NaiveDate> {
        // start <= end holds for every constructed window
        calendar::complete(self.start, self.end).unwrap_or_default()
    }
}

/// One calendar day of a store's series. `count` is `None` when the day has
/// no valid observation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
pub struct AlignedPoint {
    pub date: NaiveDate,
    pub count: Option<u32>,
}

impl AlignedPoint {
    pub fn has_data(&self) -> bool {
        self.count.is_some()
    }
}

/// Tick label for one day on the chart's x-axis
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct AxisLabel {
    pub date: NaiveDate,
    pub text: String,

    /// Weekend or holiday, rendered in bold
    pub emphasized: bool,
}

/// Month name shown under the middle of that month's days
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct MonthAnnotation {
    pub anchor_date: NaiveDate,
    pub text: String,
}

/// Everything needed to draw one store's chart
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct StoreChart {
    pub store: String,
    pub points: Vec<AlignedPoint>,
    pub labels: Vec<AxisLabel>,
    pub months: Vec<MonthAnnotation>,
}

impl StoreChart {
    /// True when no day in the window has a usable count
    pub fn is_empty(&self) -> bool {
        !self.points.iter().any(AlignedPoint::has_data)
    }

    /// Largest count in the series, if any
    pub fn peak(&self) -> Option<u32> {
        self.points.iter().filter_map(|p| p.count).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window_rejects_reversed_bounds() {
        let err = DateWindow::new(date(2024, 7, 3), date(2024, 7, 1)).unwrap_err();
        assert!(matches!(err, ReportError::InvalidRange { .. }));
    }

    #[test]
    fn test_window_single_day() {
        let window = DateWindow::new(date(2024, 7, 4), date(2024, 7, 4)).unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window.days(), vec![date(2024, 7, 4)]);
    }

    #[test]
    fn test_window_len_across_leap_day() {
        let window = DateWindow::new(date(2024, 2, 27), date(2024, 3, 2)).unwrap();
        assert_eq!(window.len(), 5);
        assert!(window.days().contains(&date(2024, 2, 29)));
    }

    #[test]
    fn test_trailing_window_ends_yesterday() {
        let window = DateWindow::trailing(date(2024, 7, 10), 3);
        assert_eq!(window.start(), date(2024, 7, 7));
        assert_eq!(window.end(), date(2024, 7, 9));
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn test_trailing_window_zero_days_is_one_day() {
        let window = DateWindow::trailing(date(2024, 1, 1), 0);
        assert_eq!(window.start(), date(2023, 12, 31));
        assert_eq!(window.end(), date(2023, 12, 31));
    }

    #[test]
    fn test_aligned_point_serializes_missing_as_null() {
        let point = AlignedPoint {
            date: date(2024, 7, 2),
            count: None,
        };
        let json = serde_json::to_string(&point).unwrap();
        assert_eq!(json, r#"{"date":"2024-07-02","count":null}"#);
    }

    #[test]
    fn test_store_chart_peak_and_empty() {
        let chart = StoreChart {
            store: "Bata Capital".to_string(),
            points: vec![
                AlignedPoint {
                    date: date(2024, 7, 1),
                    count: Some(50),
                },
                AlignedPoint {
                    date: date(2024, 7, 2),
                    count: None,
                },
                AlignedPoint {
                    date: date(2024, 7, 3),
                    count: Some(120),
                },
            ],
            labels: vec![],
            months: vec![],
        };
        assert_eq!(chart.peak(), Some(120));
        assert!(!chart.is_empty());

        let blank = StoreChart {
            points: vec![AlignedPoint {
                date: date(2024, 7, 1),
                count: None,
            }],
            ..chart
        };
        assert!(blank.is_empty());
        assert_eq!(blank.peak(), None);
    }
}
