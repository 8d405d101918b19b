//! Calendar years and year windows.

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A calendar year with no sub-year precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Year(i32);

impl Year {
    /// Earliest supported year.
    pub const MIN: i32 = 1;
    /// Latest supported year.
    pub const MAX: i32 = 9999;

    /// Create a year, rejecting values outside `MIN..=MAX`.
    pub fn new(value: i32) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    /// Parse a wide-column header such as `"1990"`. Only four ASCII digits are accepted.
    pub fn parse_header(header: &str) -> Option<Self> {
        let trimmed = header.trim();
        if trimmed.len() != 4 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        trimmed.parse().ok().and_then(Self::new)
    }

    /// Parse a stored value: `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD` or a bare year.
    pub fn parse_stored(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
            return Self::new(dt.year());
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Self::new(date.year());
        }
        Self::parse_header(trimmed)
    }

    /// The numeric year.
    pub fn value(self) -> i32 {
        self.0
    }

    /// 1 January of this year.
    pub fn start_date(self) -> NaiveDate {
        NaiveDate::from_yo_opt(self.0, 1).unwrap_or_default()
    }

    /// Position on the interpolation time axis, in days.
    pub fn axis(self) -> i64 {
        i64::from(self.start_date().num_days_from_ce())
    }

    /// Timestamp text written to the store.
    pub fn to_timestamp_text(self) -> String {
        format!("{:04}-01-01 00:00:00", self.0)
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

impl TryFrom<i32> for Year {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Year::new(value).ok_or_else(|| format!("year {} out of range", value))
    }
}

impl From<Year> for i32 {
    fn from(year: Year) -> Self {
        year.0
    }
}

/// Inclusive bounds on the years a table keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i32>,
}

impl YearWindow {
    /// Window with both bounds.
    pub fn between(min: i32, max: i32) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Window with only an upper bound.
    pub fn up_to(max: i32) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    /// Window that keeps every year.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, year: Year) -> bool {
        self.min.is_none_or(|min| year.value() >= min)
            && self.max.is_none_or(|max| year.value() <= max)
    }
}
