//! Query windows
//!
//! Every aggregate is computed over an inclusive range of calendar dates.

use crate::error::{AppError, Result};
use chrono::{Datelike, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Earliest and latest years a window may touch
pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 9999;

/// Inclusive `[start, end]` range of calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(AppError::Validation(format!(
                "Start date {} is after end date {}",
                start, end
            )));
        }
        for date in [start, end] {
            if !(MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
                return Err(AppError::Validation(format!(
                    "Date {} is outside the supported years {}-{}",
                    date, MIN_YEAR, MAX_YEAR
                )));
            }
        }
        Ok(Self { start, end })
    }

    /// Number of calendar days covered, both ends included
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Window of the same length ending the day before this one starts
    pub fn previous(&self) -> Result<Self> {
        let end = days_before(self.start, 1)?;
        let start = days_before(end, self.len_days() - 1)?;
        Self::new(start, end)
    }

    /// Bind parameters for `BETWEEN ? AND ?` date filters
    pub fn bind_params(&self) -> Vec<String> {
        vec![
            self.start.format("%Y-%m-%d").to_string(),
            self.end.format("%Y-%m-%d").to_string(),
        ]
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

/// Quick date-range selections offered by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePreset {
    Last7Days,
    Last30Days,
    Last90Days,
    ThisMonth,
    Custom,
}

impl DatePreset {
    /// Resolve the preset against `today`
    ///
    /// `Custom` uses the explicit bounds when both are given and otherwise
    /// falls back to the last `default_days` days.
    pub fn resolve(
        &self,
        today: NaiveDate,
        custom: Option<(NaiveDate, NaiveDate)>,
        default_days: i64,
    ) -> Result<DateWindow> {
        match self {
            DatePreset::Last7Days => DateWindow::new(days_before(today, 7)?, today),
            DatePreset::Last30Days => DateWindow::new(days_before(today, 30)?, today),
            DatePreset::Last90Days => DateWindow::new(days_before(today, 90)?, today),
            DatePreset::ThisMonth => {
                let first = today.with_day(1).unwrap_or(today);
                DateWindow::new(first, today)
            }
            DatePreset::Custom => match custom {
                Some((start, end)) => DateWindow::new(start, end),
                None => DateWindow::new(days_before(today, default_days)?, today),
            },
        }
    }
}

impl FromStr for DatePreset {
    type Err = AppError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last7" | "last_7_days" | "7d" => Ok(DatePreset::Last7Days),
            "last30" | "last_30_days" | "30d" => Ok(DatePreset::Last30Days),
            "last90" | "last_90_days" | "90d" => Ok(DatePreset::Last90Days),
            "this_month" | "month" => Ok(DatePreset::ThisMonth),
            "custom" => Ok(DatePreset::Custom),
            other => Err(AppError::Validation(format!("Unknown date preset: '{}'", other))),
        }
    }
}

/// Today's date in the dashboard's timezone
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// `date` moved back by `days`, failing instead of overflowing
fn days_before(date: NaiveDate, days: i64) -> Result<NaiveDate> {
    u64::try_from(days)
        .ok()
        .and_then(|days| date.checked_sub_days(Days::new(days)))
        .ok_or_else(|| {
            AppError::Validation(format!("Cannot go back {} days from {}", days, date))
        })
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| AppError::Validation(format!("Invalid date '{}': {}", raw, e)))
}
