//! Calendar dates in the fixed-width `YYYYMMDD` wire form.
//!
//! Task dates travel between the storage layer, the HTTP layer and the
//! evaluator as opaque 8-digit strings. [`CalendarDate`] is the typed side of
//! that contract: parsing is strict (exactly eight ASCII digits forming a real
//! proleptic Gregorian date) and formatting always produces eight digits, so
//! `parse(format(d)) == d` for every year in `0..=9999`.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, RuleError};

/// chrono format string for the `YYYYMMDD` wire form.
pub const DATE_FORMAT: &str = "%Y%m%d";

/// A date without time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDate(NaiveDate);

impl CalendarDate {
    /// Build a date from its parts, `None` if the parts do not name a real day.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Parse the 8-digit `YYYYMMDD` form.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidAnchorFormat`] if the string is not exactly
    /// eight digits or does not name a real calendar day (e.g. `20230229`).
    pub fn parse(s: &str) -> Result<Self> {
        if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RuleError::InvalidAnchorFormat(s.to_string()));
        }
        NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Self)
            .map_err(|_| RuleError::InvalidAnchorFormat(s.to_string()))
    }

    pub fn naive(self) -> NaiveDate {
        self.0
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    pub fn day(self) -> u32 {
        self.0.day()
    }

    /// ISO weekday number: 1 = Monday .. 7 = Sunday.
    pub fn iso_weekday(self) -> u32 {
        self.0.weekday().number_from_monday()
    }

    /// Length of this date's month.
    pub fn days_in_month(self) -> u32 {
        days_in_month(self.year(), self.month())
    }

    pub fn add_days(self, days: u64) -> Result<Self> {
        self.0
            .checked_add_days(Days::new(days))
            .map(Self)
            .ok_or(RuleError::DateOutOfRange)
    }

    /// Add whole months, clamping the day to the target month's length
    /// (Jan 31 + 1 month = Feb 28/29).
    pub fn add_months(self, months: u32) -> Result<Self> {
        self.0
            .checked_add_months(Months::new(months))
            .map(Self)
            .ok_or(RuleError::DateOutOfRange)
    }

    /// The 1st of the month after this one.
    pub fn first_of_next_month(self) -> Result<Self> {
        let first = self.0.with_day(1).ok_or(RuleError::DateOutOfRange)?;
        Self(first).add_months(1)
    }
}

impl From<NaiveDate> for CalendarDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl From<CalendarDate> for NaiveDate {
    fn from(date: CalendarDate) -> Self {
        date.0
    }
}

impl FromStr for CalendarDate {
    type Err = RuleError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl Serialize for CalendarDate {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CalendarDate {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Proleptic Gregorian leap year test.
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in `month` (1-12) of `year`. Returns 0 for a month outside 1-12.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}
