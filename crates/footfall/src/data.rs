use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

use crate::align::{align, order_stores};
use crate::calendar::{self, HolidayCalendar};
use crate::db;
use crate::error::ReportError;
use crate::parser;
use crate::types::{DateWindow, RawObservation, StoreChart};

/// Longest window a selection may cover, about three years
pub const MAX_WINDOW_DAYS: usize = 1096;

/// File extensions read as SQLite databases; anything else is CSV
const SQLITE_EXTENSIONS: &[&str] = &["db", "sqlite", "sqlite3"];

/// Read-only snapshot of every observation, loaded once at startup
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    observations: Vec<RawObservation>,
    stores: BTreeSet<String>,
}

impl Dataset {
    pub fn new(observations: Vec<RawObservation>) -> Self {
        let stores = observations.iter().map(|o| o.store.clone()).collect();
        Self {
            observations,
            stores,
        }
    }

    /// Load a CSV export or SQLite database, chosen by file extension
    pub fn load(path: &Path) -> Result<Self> {
        let observations = if is_sqlite(path) {
            let conn = db::open_readonly(path)?;
            db::load_observations(&conn)
                .with_context(|| format!("Failed to read {}", path.display()))?
        } else {
            parser::parse_csv(path)?
        };

        let dataset = Self::new(observations);
        info!(
            path = %path.display(),
            rows = dataset.len(),
            stores = dataset.stores.len(),
            span = ?dataset.date_span(),
            "Dataset loaded"
        );
        Ok(dataset)
    }

    pub fn observations(&self) -> &[RawObservation] {
        &self.observations
    }

    /// Distinct store names, sorted
    pub fn stores(&self) -> &BTreeSet<String> {
        &self.stores
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Earliest and latest observation dates
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.observations.iter().map(|o| o.date).min()?;
        let max = self.observations.iter().map(|o| o.date).max()?;
        Some((min, max))
    }
}

pub fn is_sqlite(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SQLITE_EXTENSIONS.iter().any(|s| e.eq_ignore_ascii_case(s)))
        .unwrap_or(false)
}

/// Raw store and window choice as submitted by the page controls
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectionQuery {
    pub store: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub reset: Option<String>,
}

/// A validated store and window. `store` is `None` for every store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub store: Option<String>,
    pub window: DateWindow,
}

impl Selection {
    pub fn default_for(today: NaiveDate, window_days: u32) -> Self {
        Self {
            store: None,
            window: DateWindow::trailing(today, window_days),
        }
    }
}

/// Turn page input into a selection.
///
/// Missing bounds fall back to the default trailing window computed from
/// `today`; a reset discards both submitted bounds. Windows longer than
/// [`MAX_WINDOW_DAYS`] are rejected.
pub fn resolve_selection(
    query: &SelectionQuery,
    today: NaiveDate,
    window_days: u32,
) -> Result<Selection, ReportError> {
    let store = non_empty(&query.store).map(str::to_string);
    let default = DateWindow::trailing(today, window_days);

    if query.reset.is_some() {
        return Ok(Selection {
            store,
            window: default,
        });
    }

    let start = match non_empty(&query.start) {
        Some(s) => parse_bound(s)?,
        None => default.start(),
    };
    let end = match non_empty(&query.end) {
        Some(s) => parse_bound(s)?,
        None => default.end(),
    };

    let window = DateWindow::new(start, end)?;
    if window.len() > MAX_WINDOW_DAYS {
        return Err(ReportError::WindowTooLong {
            days: window.len(),
            max: MAX_WINDOW_DAYS,
        });
    }

    Ok(Selection { store, window })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_bound(value: &str) -> Result<NaiveDate, ReportError> {
    parser::parse_date(value).ok_or_else(|| ReportError::InvalidDate(value.to_string()))
}

/// Charts for a selection, ready for rendering
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub selection: Selection,
    pub charts: Vec<StoreChart>,
}

/// Build one chart per selected store.
///
/// With no store selected every store in the dataset gets a chart, the
/// preferred ones first.
pub fn build_report(
    dataset: &Dataset,
    selection: &Selection,
    preferred: &[String],
    holidays: &HolidayCalendar,
) -> Report {
    let window = selection.window;
    let days = window.days();
    let (labels, months) = calendar::labels(&days, holidays);

    let stores = match &selection.store {
        Some(store) => vec![store.clone()],
        None => order_stores(dataset.stores(), preferred),
    };

    let charts = stores
        .into_iter()
        .map(|store| {
            let points = align(dataset.observations(), &store, &window);
            StoreChart {
                store,
                points,
                labels: labels.clone(),
                months: months.clone(),
            }
        })
        .collect();

    Report {
        selection: selection.clone(),
        charts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_dataset() -> Dataset {
        Dataset::new(vec![
            RawObservation::new("Bata Westgate", date(2024, 7, 1), Some(10)),
            RawObservation::new("Bata Capital", date(2024, 7, 1), Some(50)),
            RawObservation::new("Bata Capital", date(2024, 7, 3), Some(0)),
            RawObservation::new("Bata CD Outlet", date(2024, 7, 2), Some(30)),
        ])
    }

    fn query(start: Option<&str>, end: Option<&str>) -> SelectionQuery {
        SelectionQuery {
            store: None,
            start: start.map(str::to_string),
            end: end.map(str::to_string),
            reset: None,
        }
    }

    // ========== Dataset tests ==========

    #[test]
    fn test_dataset_stores_sorted_and_distinct() {
        let dataset = sample_dataset();
        let stores: Vec<&str> = dataset.stores().iter().map(String::as_str).collect();
        assert_eq!(stores, vec!["Bata CD Outlet", "Bata Capital", "Bata Westgate"]);
        assert_eq!(dataset.len(), 4);
    }

    #[test]
    fn test_dataset_date_span() {
        assert_eq!(
            sample_dataset().date_span(),
            Some((date(2024, 7, 1), date(2024, 7, 3)))
        );
        assert_eq!(Dataset::default().date_span(), None);
    }

    #[test]
    fn test_dataset_load_csv() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Store,Date,Foot Count").unwrap();
        writeln!(file, "Bata Capital,2024-07-01,377").unwrap();
        file.flush().unwrap();

        let dataset = Dataset::load(file.path()).unwrap();
        assert_eq!(dataset.len(), 1);
        assert!(dataset.stores().contains("Bata Capital"));
    }

    #[test]
    fn test_dataset_load_sqlite() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("counts.db");
        let conn = db::init_db(&db_path).unwrap();
        db::import_observations(&conn, sample_dataset().observations()).unwrap();
        drop(conn);

        let dataset = Dataset::load(&db_path).unwrap();
        assert_eq!(dataset.observations(), sample_dataset().observations());
    }

    #[test]
    fn test_dataset_load_missing_column_propagates() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Store,Foot Count").unwrap();
        file.flush().unwrap();

        let err = Dataset::load(file.path()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ReportError>(),
            Some(&ReportError::MissingColumn("Date"))
        );
    }

    #[test]
    fn test_is_sqlite() {
        assert!(is_sqlite(Path::new("counts.db")));
        assert!(is_sqlite(Path::new("counts.SQLite")));
        assert!(!is_sqlite(Path::new("FootCounts_new.csv")));
        assert!(!is_sqlite(Path::new("counts")));
    }

    // ========== resolve_selection tests ==========

    #[test]
    fn test_resolve_defaults_to_trailing_window() {
        let selection = resolve_selection(&SelectionQuery::default(), date(2024, 7, 10), 3).unwrap();
        assert_eq!(selection.store, None);
        assert_eq!(selection.window.start(), date(2024, 7, 7));
        assert_eq!(selection.window.end(), date(2024, 7, 9));
    }

    #[test]
    fn test_resolve_explicit_window_and_store() {
        let mut q = query(Some("2024-07-01"), Some("2024-07-03"));
        q.store = Some("Bata Capital".to_string());
        let selection = resolve_selection(&q, date(2024, 8, 1), 30).unwrap();
        assert_eq!(selection.store.as_deref(), Some("Bata Capital"));
        assert_eq!(selection.window.len(), 3);
    }

    #[test]
    fn test_resolve_empty_fields_are_absent() {
        let mut q = query(Some(""), Some("  "));
        q.store = Some(String::new());
        let selection = resolve_selection(&q, date(2024, 7, 10), 3).unwrap();
        assert_eq!(selection, Selection::default_for(date(2024, 7, 10), 3));
    }

    #[test]
    fn test_resolve_reversed_range_fails() {
        let err = resolve_selection(
            &query(Some("2024-07-05"), Some("2024-07-01")),
            date(2024, 8, 1),
            30,
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::InvalidRange { .. }));
    }

    #[test]
    fn test_resolve_rejects_oversized_window() {
        let err = resolve_selection(
            &query(Some("0001-01-01"), Some("9999-12-31")),
            date(2024, 8, 1),
            30,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ReportError::WindowTooLong {
                max: MAX_WINDOW_DAYS,
                ..
            }
        ));
    }

    #[test]
    fn test_resolve_accepts_window_at_limit() {
        let start = date(2022, 1, 1);
        let end = start + chrono::Duration::days(MAX_WINDOW_DAYS as i64 - 1);
        let (first, last) = (start.to_string(), end.to_string());
        let q = query(Some(first.as_str()), Some(last.as_str()));

        let selection = resolve_selection(&q, date(2026, 1, 1), 30).unwrap();
        assert_eq!(selection.window.len(), MAX_WINDOW_DAYS);

        let past = (end + chrono::Duration::days(1)).to_string();
        let q = query(Some(first.as_str()), Some(past.as_str()));
        assert!(resolve_selection(&q, date(2026, 1, 1), 30).is_err());
    }

    #[test]
    fn test_resolve_bad_date_fails() {
        let err = resolve_selection(&query(Some("soon"), None), date(2024, 8, 1), 30).unwrap_err();
        assert_eq!(err, ReportError::InvalidDate("soon".to_string()));
    }

    #[test]
    fn test_resolve_reset_uses_today_at_reset_time() {
        let mut q = query(Some("2024-07-05"), Some("2024-07-01"));
        q.reset = Some("1".to_string());
        q.store = Some("Bata Capital".to_string());

        let first = resolve_selection(&q, date(2024, 9, 1), 7).unwrap();
        let later = resolve_selection(&q, date(2024, 9, 15), 7).unwrap();

        assert_eq!(first.window.end(), date(2024, 8, 31));
        assert_eq!(later.window.end(), date(2024, 9, 14));
        assert_eq!(later.store.as_deref(), Some("Bata Capital"));
    }

    // ========== build_report tests ==========

    #[test]
    fn test_build_report_all_stores_in_order() {
        let dataset = sample_dataset();
        let selection = resolve_selection(
            &query(Some("2024-07-01"), Some("2024-07-03")),
            date(2024, 8, 1),
            30,
        )
        .unwrap();
        let preferred = vec!["Bata Westgate".to_string()];

        let report = build_report(&dataset, &selection, &preferred, &HolidayCalendar::default());
        let names: Vec<&str> = report.charts.iter().map(|c| c.store.as_str()).collect();
        assert_eq!(names, vec!["Bata Westgate", "Bata CD Outlet", "Bata Capital"]);
        assert!(report.charts.iter().all(|c| c.points.len() == 3));
        assert!(report.charts.iter().all(|c| c.labels.len() == 3));
    }

    #[test]
    fn test_build_report_end_to_end_series() {
        let dataset = sample_dataset();
        let mut q = query(Some("2024-07-01"), Some("2024-07-03"));
        q.store = Some("Bata Capital".to_string());
        let selection = resolve_selection(&q, date(2024, 8, 1), 30).unwrap();

        let report = build_report(&dataset, &selection, &[], &HolidayCalendar::default());
        assert_eq!(report.charts.len(), 1);
        let counts: Vec<Option<u32>> = report.charts[0].points.iter().map(|p| p.count).collect();
        assert_eq!(counts, vec![Some(50), None, None]);
        assert_eq!(report.charts[0].months.len(), 1);
    }

    #[test]
    fn test_build_report_unknown_store_is_empty_chart() {
        let dataset = sample_dataset();
        let mut q = query(Some("2024-07-01"), Some("2024-07-03"));
        q.store = Some("Bata Nowhere".to_string());
        let selection = resolve_selection(&q, date(2024, 8, 1), 30).unwrap();

        let report = build_report(&dataset, &selection, &[], &HolidayCalendar::default());
        assert_eq!(report.charts.len(), 1);
        assert!(report.charts[0].is_empty());
        assert_eq!(report.charts[0].points.len(), 3);
    }

    #[test]
    fn test_build_report_empty_dataset_has_no_charts() {
        let selection = Selection::default_for(date(2024, 8, 1), 30);
        let report = build_report(&Dataset::default(), &selection, &[], &HolidayCalendar::default());
        assert!(report.charts.is_empty());
    }
}
