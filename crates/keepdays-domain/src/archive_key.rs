//! Archive key module - parsing `{YYYY-MM-DD}/{HH-MM-SS}_{basename}.{ext}` keys

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use std::fmt;
use thiserror::Error;

/// Errors raised while parsing an archive key
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The key does not split into exactly `date/filename`
    #[error("Malformed archive key '{key}': expected exactly one '/', found {found}")]
    SegmentCount {
        /// Offending key
        key: String,
        /// Number of '/' separators found
        found: usize,
    },

    /// The filename has no `_` between the time and the basename
    #[error("Malformed archive key '{0}': missing '_' after the time segment")]
    MissingTimeSeparator(String),

    /// A date or time segment does not have three dash-separated fields
    #[error("Malformed archive key '{key}': {segment} segment '{value}' must have 3 fields")]
    FieldCount {
        /// Offending key
        key: String,
        /// Which segment ("date" or "time")
        segment: &'static str,
        /// The raw segment
        value: String,
    },

    /// A date or time field is not a decimal number
    #[error("Malformed archive key '{key}': {field} '{value}' is not numeric")]
    NonNumeric {
        /// Offending key
        key: String,
        /// Field name (year, month, ...)
        field: &'static str,
        /// The raw field
        value: String,
    },

    /// Fields are numeric but do not form a real calendar timestamp
    #[error("Malformed archive key '{0}': not a valid calendar date/time")]
    InvalidTimestamp(String),

    /// The basename has no `.ext` suffix
    #[error("Malformed archive key '{0}': filename has no extension")]
    MissingExtension(String),

    /// Removing the extension leaves nothing
    #[error("Malformed archive key '{0}': archive group name is empty")]
    EmptyArchiveGroup(String),
}

/// A parsed archive key
///
/// Holds the original key string alongside the archive group and the
/// timestamp it encodes. Ordering is chronological, ties broken by key,
/// which is the order the tier classifier consumes archives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveKey {
    key: String,
    archive_group: String,
    timestamp: NaiveDateTime,
}

impl ArchiveKey {
    /// Parse an archive key
    ///
    /// # Examples
    ///
    /// ```
    /// use keepdays_domain::ArchiveKey;
    ///
    /// let key = ArchiveKey::parse("2023-04-01/06-30-00_documents.tar").unwrap();
    /// assert_eq!(key.archive_group(), "documents");
    /// assert_eq!(key.timestamp().to_string(), "2023-04-01 06:30:00");
    /// ```
    pub fn parse(key: &str) -> Result<Self, ParseError> {
        let (archive_group, timestamp) = parse_key(key)?;
        Ok(Self {
            key: key.to_string(),
            archive_group,
            timestamp,
        })
    }

    /// The raw object key
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Logical backup set this archive belongs to
    pub fn archive_group(&self) -> &str {
        &self.archive_group
    }

    /// Creation timestamp encoded in the key
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Consume and return the raw key string
    pub fn into_string(self) -> String {
        self.key
    }
}

impl PartialOrd for ArchiveKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ArchiveKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.key.cmp(&other.key))
    }
}

impl fmt::Display for ArchiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl std::str::FromStr for ArchiveKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Split an archive key into `(archive_group, timestamp)`
pub fn parse_key(key: &str) -> Result<(String, NaiveDateTime), ParseError> {
    let slashes = key.matches('/').count();
    if slashes != 1 {
        return Err(ParseError::SegmentCount {
            key: key.to_string(),
            found: slashes,
        });
    }
    // Exactly one '/' was counted above
    let (date_segment, filename) = key.split_once('/').unwrap_or_default();

    let (time_segment, basename) = filename
        .split_once('_')
        .ok_or_else(|| ParseError::MissingTimeSeparator(key.to_string()))?;

    let archive_group = match basename.rsplit_once('.') {
        Some((group, _ext)) if !group.is_empty() => group.to_string(),
        Some(_) => return Err(ParseError::EmptyArchiveGroup(key.to_string())),
        None => return Err(ParseError::MissingExtension(key.to_string())),
    };

    let [year, month, day] = split_fields(key, "date", date_segment)?;
    let [hour, minute, second] = split_fields(key, "time", time_segment)?;

    let year = calendar_year(key, year)?;
    let date = NaiveDate::from_ymd_opt(
        year,
        numeric(key, "month", month)?,
        numeric(key, "day", day)?,
    );
    let (hour, minute, second) = (
        numeric(key, "hour", hour)?,
        numeric(key, "minute", minute)?,
        numeric(key, "second", second)?,
    );

    let timestamp = date
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .ok_or_else(|| ParseError::InvalidTimestamp(key.to_string()))?;
    Ok((archive_group, timestamp))
}

/// Build the canonical archive key for `filename` stored at `timestamp`
///
/// Inverse of [`parse_key`]: `parse_key(&build_archive_key(name, ts))` yields
/// `ts` and `name` minus its final extension.
///
/// ```
/// use chrono::NaiveDate;
/// use keepdays_domain::build_archive_key;
///
/// let ts = NaiveDate::from_ymd_opt(2024, 2, 9).unwrap().and_hms_opt(3, 4, 5).unwrap();
/// assert_eq!(build_archive_key("photos.zip", ts), "2024-02-09/03-04-05_photos.zip");
/// ```
pub fn build_archive_key(filename: &str, timestamp: NaiveDateTime) -> String {
    format!(
        "{:04}-{:02}-{:02}/{:02}-{:02}-{:02}_{}",
        timestamp.year(),
        timestamp.month(),
        timestamp.day(),
        timestamp.hour(),
        timestamp.minute(),
        timestamp.second(),
        filename
    )
}

fn split_fields<'a>(
    key: &str,
    segment: &'static str,
    value: &'a str,
) -> Result<[&'a str; 3], ParseError> {
    let fields: Vec<&str> = value.split('-').collect();
    match fields.as_slice() {
        [a, b, c] => Ok([*a, *b, *c]),
        _ => Err(ParseError::FieldCount {
            key: key.to_string(),
            segment,
            value: value.to_string(),
        }),
    }
}

/// Four-digit year in `1..=9999`
fn calendar_year(key: &str, value: &str) -> Result<i32, ParseError> {
    let invalid = || ParseError::InvalidTimestamp(key.to_string());
    if value.len() != 4 {
        return Err(invalid());
    }
    let year = numeric(key, "year", value)?;
    i32::try_from(year)
        .ok()
        .filter(|year| *year >= 1)
        .ok_or_else(invalid)
}

fn numeric(key: &str, field: &'static str, value: &str) -> Result<u32, ParseError> {
    let non_numeric = || ParseError::NonNumeric {
        key: key.to_string(),
        field,
        value: value.to_string(),
    };
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(non_numeric());
    }
    value.parse().map_err(|_| non_numeric())
}
