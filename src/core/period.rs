//! Calendar month windows.
//!
//! A [`MonthWindow`] is the half-open range `[first day of month, first day of
//! next month)`. Rollover and reporting only ever reason in whole calendar
//! months, never in rolling 30-day spans.

use chrono::{Datelike, Days, Months, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;

/// Today's date in UTC, the wall clock the rollover is checked against.
#[must_use]
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// One calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MonthWindow {
    start: NaiveDate,
}

impl MonthWindow {
    /// The month containing `date`.
    #[must_use]
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            start: date - Days::new(u64::from(date.day0())),
        }
    }

    /// The month with the given year and number (1-12), if valid.
    #[must_use]
    pub fn from_year_month(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|start| Self { start })
    }

    /// First day of the month (inclusive).
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// First day of the following month (exclusive bound).
    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.start + Months::new(1)
    }

    /// Last day of the month (inclusive bound).
    #[must_use]
    pub fn last_day(&self) -> NaiveDate {
        self.end() - Days::new(1)
    }

    /// The month before this one.
    #[must_use]
    pub fn previous(&self) -> Self {
        Self {
            start: self.start - Months::new(1),
        }
    }

    /// The month after this one.
    #[must_use]
    pub fn next(&self) -> Self {
        Self { start: self.end() }
    }

    /// Whether `date` falls within this month.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end()
    }

    /// Calendar year.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.start.year()
    }

    /// Month number, 1-12.
    #[must_use]
    pub fn month(&self) -> u32 {
        self.start.month()
    }
}

impl fmt::Display for MonthWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start.format("%B %Y"))
    }
}
