// ABOUTME: Validated inclusive calendar date range with canonical YYYY-MM-DD rendering
// ABOUTME: Parses the date shapes dashboards send and derives the preceding comparison period
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::{PlatformError, PlatformResult};

/// Canonical wire format handed to every adapter
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

const ACCEPTED_DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d"];

/// Inclusive range of calendar dates, `start <= end`
///
/// The only way to obtain a `DateRange` is through [`DateRange::new`] or
/// [`DateRange::parse`] (deserialization goes through the same check), so a
/// value of this type is always ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawDateRange {
    start: String,
    end: String,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = PlatformError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        Self::parse(&raw.start, &raw.end)
    }
}

impl DateRange {
    /// Build a range, rejecting `start > end` with a configuration error
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Config` when `start` is after `end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> PlatformResult<Self> {
        if start > end {
            return Err(PlatformError::config(format!(
                "invalid date range: start {} is after end {}",
                start.format(CANONICAL_DATE_FORMAT),
                end.format(CANONICAL_DATE_FORMAT)
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse both bounds from any accepted date shape, then validate ordering
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Config` for unparseable dates or `start > end`
    pub fn parse(start: &str, end: &str) -> PlatformResult<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// Single-day range
    #[must_use]
    pub const fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// First day
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day (inclusive)
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Start in canonical `YYYY-MM-DD`
    #[must_use]
    pub fn start_str(&self) -> String {
        self.start.format(CANONICAL_DATE_FORMAT).to_string()
    }

    /// End in canonical `YYYY-MM-DD`
    #[must_use]
    pub fn end_str(&self) -> String {
        self.end.format(CANONICAL_DATE_FORMAT).to_string()
    }

    /// Number of days covered, counting both ends
    #[must_use]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Whether `day` falls inside the range
    #[must_use]
    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && day <= self.end
    }

    /// The range of equal length ending the day before this one starts
    #[must_use]
    pub fn previous_period(&self) -> Self {
        let end = self.start - Duration::days(1);
        let start = end - Duration::days(self.days() - 1);
        Self { start, end }
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start_str(), self.end_str())
    }
}

/// Parse a single date from the shapes dashboards and spreadsheets produce
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `MM/DD/YYYY`, `YYYYMMDD` and full
/// RFC 3339 timestamps (the date part is kept).
///
/// # Errors
///
/// Returns `PlatformError::Config` when no accepted shape matches
pub fn parse_date(input: &str) -> PlatformResult<NaiveDate> {
    let trimmed = input.trim();
    for format in ACCEPTED_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|timestamp| timestamp.date_naive())
        .map_err(|_| PlatformError::config(format!("unrecognized date: {input}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn rejects_start_after_end() {
        let err = DateRange::parse("2024-03-10", "2024-03-01").unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Config);
    }

    #[test]
    fn normalizes_mixed_input_formats() {
        let range = DateRange::parse("03/01/2024", "2024/03/31").unwrap();
        assert_eq!(range.start_str(), "2024-03-01");
        assert_eq!(range.end_str(), "2024-03-31");
        assert_eq!(range.days(), 31);
    }

    #[test]
    fn accepts_rfc3339_timestamps() {
        let range = DateRange::parse("2024-01-05T10:00:00Z", "2024-01-06T00:00:00+00:00").unwrap();
        assert_eq!(range.start(), date(2024, 1, 5));
        assert_eq!(range.end(), date(2024, 1, 6));
    }

    #[test]
    fn previous_period_has_equal_length_and_abuts() {
        let range = DateRange::new(date(2024, 3, 1), date(2024, 3, 7)).unwrap();
        let previous = range.previous_period();
        assert_eq!(previous.start(), date(2024, 2, 23));
        assert_eq!(previous.end(), date(2024, 2, 29));
        assert_eq!(previous.days(), range.days());
    }

    #[test]
    fn deserialization_enforces_ordering() {
        let ok: DateRange =
            serde_json::from_str(r#"{"start":"2024-01-01","end":"2024-01-31"}"#).unwrap();
        assert!(ok.contains(date(2024, 1, 15)));
        assert!(!ok.contains(date(2024, 2, 1)));

        let bad = serde_json::from_str::<DateRange>(r#"{"start":"2024-02-01","end":"2024-01-31"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn serializes_canonical_dates() {
        let range = DateRange::single_day(date(2024, 12, 5));
        let json = serde_json::to_string(&range).unwrap();
        assert_eq!(json, r#"{"start":"2024-12-05","end":"2024-12-05"}"#);
    }
}
