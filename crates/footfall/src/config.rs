//! Configuration loading from environment variables.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::PathBuf;

use crate::calendar::HolidayCalendar;
use crate::data::MAX_WINDOW_DAYS;
use crate::parser;

const DEFAULT_DATA_PATH: &str = "data/foot_counts.csv";
const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Dashboard settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// CSV export or SQLite database holding the foot counts
    pub data_path: PathBuf,

    /// Stores listed before the alphabetical remainder
    pub preferred_stores: Vec<String>,

    /// Length of the default trailing window
    pub window_days: u32,

    /// Holidays on top of the built-in list
    pub extra_holidays: Vec<NaiveDate>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            preferred_stores: Vec::new(),
            window_days: DEFAULT_WINDOW_DAYS,
            extra_holidays: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from environment variables.
    ///
    /// Reads `FOOTFALL_DATA`, `FOOTFALL_PREFERRED_STORES` (comma separated),
    /// `FOOTFALL_WINDOW_DAYS` and `FOOTFALL_HOLIDAYS` (comma separated
    /// dates), either from the environment or from a `.env` file. Unset
    /// variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(path) = lookup("FOOTFALL_DATA").filter(|v| !v.trim().is_empty()) {
            settings.data_path = PathBuf::from(path.trim());
        }

        if let Some(stores) = lookup("FOOTFALL_PREFERRED_STORES") {
            settings.preferred_stores = split_list(&stores).map(str::to_string).collect();
        }

        if let Some(days) = lookup("FOOTFALL_WINDOW_DAYS") {
            settings.window_days = days
                .trim()
                .parse()
                .with_context(|| format!("FOOTFALL_WINDOW_DAYS is not a number: {days}"))?;
            if settings.window_days == 0 || settings.window_days as usize > MAX_WINDOW_DAYS {
                anyhow::bail!("FOOTFALL_WINDOW_DAYS must be between 1 and {MAX_WINDOW_DAYS}");
            }
        }

        if let Some(dates) = lookup("FOOTFALL_HOLIDAYS") {
            settings.extra_holidays = split_list(&dates)
                .map(|d| {
                    parser::parse_date(d)
                        .with_context(|| format!("FOOTFALL_HOLIDAYS has an invalid date: {d}"))
                })
                .collect::<Result<_>>()?;
        }

        Ok(settings)
    }

    /// Built-in holidays plus the configured extras
    pub fn holidays(&self) -> HolidayCalendar {
        HolidayCalendar::kenya_2024().with_extra(self.extra_holidays.iter().copied())
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> + '_ {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}
