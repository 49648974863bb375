//! Time-bucket keys for per-user windowed limits
//!
//! Day buckets are UTC calendar dates. Week buckets follow ISO-8601: weeks
//! start on Monday and week 1 is the week containing the year's first
//! Thursday. A week key carries the ISO week-year, so the same week number
//! in different years never collides.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// UTC calendar day, rendered as `YYYY-MM-DD`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(NaiveDate);

/// ISO-8601 week, rendered as `YYYY-Www`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekKey {
    year: i32,
    week: u32,
}

impl DayKey {
    pub fn from_instant(now: DateTime<Utc>) -> Self {
        Self(now.date_naive())
    }

    /// Key `weeks` whole weeks before this day, or `None` before the calendar start
    pub fn weeks_before(&self, weeks: u32) -> Option<Self> {
        self.0
            .checked_sub_days(Days::new(u64::from(weeks) * 7))
            .map(Self)
    }
}

impl From<NaiveDate> for DayKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl WeekKey {
    pub fn from_instant(now: DateTime<Utc>) -> Self {
        Self::from(DayKey::from_instant(now))
    }

    /// ISO week-year, which differs from the calendar year around New Year
    pub fn year(&self) -> i32 {
        self.year
    }

    /// ISO week number (1..=53)
    pub fn week(&self) -> u32 {
        self.week
    }
}

impl From<DayKey> for WeekKey {
    fn from(day: DayKey) -> Self {
        let iso = day.0.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-W{:02}", self.year, self.week)
    }
}

impl Serialize for DayKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Serialize for WeekKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
