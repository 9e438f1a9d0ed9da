//! Calendar decomposition of archive timestamps

use chrono::{Datelike, NaiveDateTime, Timelike};
use std::fmt;

/// One calendar granularity, coarsest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DatePart {
    /// Calendar year
    Year,
    /// Quarter of the year, 0-based
    Quarter,
    /// Month of the year, 1-based
    Month,
    /// ISO-8601 week number (week only, not the ISO week-year)
    Week,
    /// Day of the month
    Day,
    /// Seconds since midnight
    SecondOfDay,
}

impl DatePart {
    /// All levels in trie order
    pub const ALL: [DatePart; 6] = [
        DatePart::Year,
        DatePart::Quarter,
        DatePart::Month,
        DatePart::Week,
        DatePart::Day,
        DatePart::SecondOfDay,
    ];

    /// Number of trie levels
    pub const COUNT: usize = Self::ALL.len();

    /// Level name
    pub fn as_str(&self) -> &'static str {
        match self {
            DatePart::Year => "year",
            DatePart::Quarter => "quarter",
            DatePart::Month => "month",
            DatePart::Week => "week",
            DatePart::Day => "day",
            DatePart::SecondOfDay => "second",
        }
    }

    /// Extract this level's value from a timestamp
    pub fn of(&self, timestamp: &NaiveDateTime) -> i64 {
        match self {
            DatePart::Year => i64::from(timestamp.year()),
            DatePart::Quarter => i64::from(timestamp.month0() / 3),
            DatePart::Month => i64::from(timestamp.month()),
            DatePart::Week => i64::from(timestamp.iso_week().week()),
            DatePart::Day => i64::from(timestamp.day()),
            DatePart::SecondOfDay => i64::from(timestamp.num_seconds_from_midnight()),
        }
    }
}

impl fmt::Display for DatePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The ordered date-part values of one timestamp
///
/// This is the path a timestamp takes through the classifier trie:
/// year, quarter, month, ISO week, day, second-of-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatePartPath([i64; DatePart::COUNT]);

impl DatePartPath {
    /// Decompose a timestamp
    pub fn new(timestamp: &NaiveDateTime) -> Self {
        Self(DatePart::ALL.map(|part| part.of(timestamp)))
    }

    /// Values in trie order
    pub fn values(&self) -> &[i64; DatePart::COUNT] {
        &self.0
    }

    /// Value at a given level
    pub fn get(&self, part: DatePart) -> i64 {
        self.0[part as usize]
    }

    /// Iterate `(level, value)` pairs, coarsest first
    pub fn iter(&self) -> impl Iterator<Item = (DatePart, i64)> + '_ {
        DatePart::ALL.iter().copied().zip(self.0.iter().copied())
    }
}

impl From<&NaiveDateTime> for DatePartPath {
    fn from(timestamp: &NaiveDateTime) -> Self {
        Self::new(timestamp)
    }
}

impl fmt::Display for DatePartPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(part, value)| format!("{}={}", part, value))
            .collect();
        write!(f, "[{}]", parts.join(", "))
    }
}
