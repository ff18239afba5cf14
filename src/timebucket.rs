//! Time bucketing: truncating timestamps to the start of a granularity period.

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ChartError, ChartResult};

pub type Timestamp = DateTime<FixedOffset>;

/// Naive layouts accepted after RFC 3339 fails. These are read as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601 timestamp or calendar date.
pub fn parse_timestamp(input: &str) -> ChartResult<Timestamp> {
    let trimmed = input.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts);
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc().fixed_offset());
    }

    Err(ChartError::InvalidTimestamp(input.to_string()))
}

/// Time granularity of a datetime chart axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Hour,
    #[default]
    Day,
    Month,
    Year,
}

impl Granularity {
    pub const ALL: [Granularity; 4] = [
        Granularity::Hour,
        Granularity::Day,
        Granularity::Month,
        Granularity::Year,
    ];

    /// Unknown level names fall back to day-level truncation.
    pub fn parse_or_default(level: &str) -> Self {
        level.parse().unwrap_or(Granularity::Day)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Hour => "hour",
            Granularity::Day => "day",
            Granularity::Month => "month",
            Granularity::Year => "year",
        }
    }

    /// Chart-library format pattern used for ticks and tooltips at this level.
    pub fn display_format(&self) -> &'static str {
        match self {
            Granularity::Hour => "yyyy MMM d HH:00",
            Granularity::Day => "yyyy MMM d",
            Granularity::Month => "yyyy MMM",
            Granularity::Year => "yyyy",
        }
    }
}

impl FromStr for Granularity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hour" => Ok(Granularity::Hour),
            "day" => Ok(Granularity::Day),
            "month" => Ok(Granularity::Month),
            "year" => Ok(Granularity::Year),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Truncate `ts` to the start of its period, keeping its UTC offset.
pub fn truncate(ts: &Timestamp, level: Granularity) -> ChartResult<Timestamp> {
    let local = ts.naive_local();
    let date = local.date();

    let start = match level {
        Granularity::Hour => NaiveTime::from_hms_opt(local.hour(), 0, 0).map(|t| date.and_time(t)),
        Granularity::Day => Some(date.and_time(NaiveTime::MIN)),
        Granularity::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
            .map(|d| d.and_time(NaiveTime::MIN)),
        Granularity::Year => {
            NaiveDate::from_ymd_opt(date.year(), 1, 1).map(|d| d.and_time(NaiveTime::MIN))
        }
    };

    start
        .and_then(|naive| naive.and_local_timezone(*ts.offset()).single())
        .ok_or_else(|| ChartError::InvalidTimestamp(ts.to_rfc3339()))
}

/// Parse `timestamp` and truncate it to the start of its `level` period.
pub fn bucket_start(timestamp: &str, level: Granularity) -> ChartResult<Timestamp> {
    let ts = parse_timestamp(timestamp)?;
    truncate(&ts, level)
}

/// Last representable instant of the day containing `ts`.
pub fn end_of_day(ts: &Timestamp) -> ChartResult<Timestamp> {
    let start = truncate(ts, Granularity::Day)?;
    Ok(start + TimeDelta::days(1) - TimeDelta::milliseconds(1))
}
