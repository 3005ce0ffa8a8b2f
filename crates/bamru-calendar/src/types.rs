//! Calendar API types and data structures.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::Add;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unrecognized timestamp: {0:?}")]
pub struct TimestampError(pub String);

/// A point in time, either pinned to a UTC offset or floating (wall-clock
/// time with no offset).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    Zoned(DateTime<FixedOffset>),
    Floating(NaiveDateTime),
}

const ZONED_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z"];
const FLOATING_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

impl Timestamp {
    /// Parse an ISO-8601-like timestamp.
    ///
    /// Accepts RFC 3339, offsets without a colon, a space instead of `T`,
    /// date-times without an offset, and bare dates (floating midnight).
    /// Leap seconds (`:60`) are rejected; Google can't store them.
    pub fn parse(input: &str) -> Result<Self, TimestampError> {
        let trimmed = input.trim();
        let mut normalized = trimmed.to_string();
        if normalized.len() > 10 && normalized.as_bytes()[10] == b' ' {
            normalized.replace_range(10..11, "T");
        }

        match Self::parse_normalized(&normalized) {
            Some(ts) if !ts.is_leap_second() => Ok(ts),
            _ => Err(TimestampError(input.to_string())),
        }
    }

    fn parse_normalized(normalized: &str) -> Option<Self> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(normalized) {
            return Some(Self::Zoned(dt));
        }
        for format in ZONED_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(normalized, format) {
                return Some(Self::Zoned(dt));
            }
        }
        for format in FLOATING_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(normalized, format) {
                return Some(Self::Floating(dt));
            }
        }
        NaiveDate::parse_from_str(normalized, "%Y-%m-%d")
            .ok()
            .map(|date| Self::Floating(date.and_time(NaiveTime::MIN)))
    }

    // chrono represents :60 as nanoseconds past one billion.
    fn is_leap_second(&self) -> bool {
        let nanos = match self {
            Self::Zoned(dt) => dt.nanosecond(),
            Self::Floating(dt) => dt.nanosecond(),
        };
        nanos >= 1_000_000_000
    }

    /// Calendar date as written (the offset is not applied).
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Zoned(dt) => dt.date_naive(),
            Self::Floating(dt) => dt.date(),
        }
    }

    pub fn has_offset(&self) -> bool {
        matches!(self, Self::Zoned(_))
    }

    /// Time between `earlier` and `self`; `None` when one is zoned and the
    /// other floating.
    pub fn duration_since(&self, earlier: &Timestamp) -> Option<Duration> {
        match (self, earlier) {
            (Self::Zoned(a), Self::Zoned(b)) => Some(a.signed_duration_since(*b)),
            (Self::Floating(a), Self::Floating(b)) => Some(a.signed_duration_since(*b)),
            _ => None,
        }
    }

    /// `YYYY-MM-DDTHH:MM:SS[.ffffff][±HH:MM]`
    pub fn isoformat(&self) -> String {
        match self {
            Self::Zoned(dt) => format!(
                "{}{}{}",
                dt.format("%Y-%m-%dT%H:%M:%S"),
                fraction(dt.nanosecond()),
                dt.format("%:z")
            ),
            Self::Floating(dt) => format!(
                "{}{}",
                dt.format("%Y-%m-%dT%H:%M:%S"),
                fraction(dt.nanosecond())
            ),
        }
    }
}

fn fraction(nanos: u32) -> String {
    let micros = nanos / 1_000;
    if micros == 0 {
        String::new()
    } else {
        format!(".{:06}", micros)
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        match self {
            Self::Zoned(dt) => Self::Zoned(dt + rhs),
            Self::Floating(dt) => Self::Floating(dt + rhs),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.isoformat())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.isoformat())
    }
}

/// Start or end of an event: `{"date": ...}` or `{"dateTime": ...}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDateTime {
    Date(NaiveDate),
    DateTime {
        value: Timestamp,
        /// Only sent for floating values, which Google can't place otherwise.
        time_zone: Option<String>,
    },
}

impl EventDateTime {
    pub fn is_date(&self) -> bool {
        matches!(self, Self::Date(_))
    }
}

impl Serialize for EventDateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Date(date) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("date", &date.format("%Y-%m-%d").to_string())?;
                map.end()
            }
            Self::DateTime { value, time_zone } => {
                let mut map = serializer.serialize_map(Some(1 + time_zone.is_some() as usize))?;
                map.serialize_entry("dateTime", value)?;
                if let Some(tz) = time_zone {
                    map.serialize_entry("timeZone", tz)?;
                }
                map.end()
            }
        }
    }
}

/// When an event happens. Start and end always share a representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSpan {
    AllDay { start: NaiveDate, end: NaiveDate },
    Timed { start: Timestamp, end: Timestamp },
}

/// Request body for `events.insert`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewEvent {
    start: EventDateTime,
    end: EventDateTime,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewEvent {
    /// `floating_time_zone` is attached to timed values that carry no offset.
    pub fn new(span: EventSpan, summary: impl Into<String>, floating_time_zone: Option<&str>) -> Self {
        let timed = |value: Timestamp| EventDateTime::DateTime {
            value,
            time_zone: if value.has_offset() {
                None
            } else {
                floating_time_zone.map(str::to_string)
            },
        };

        let (start, end) = match span {
            EventSpan::AllDay { start, end } => (EventDateTime::Date(start), EventDateTime::Date(end)),
            EventSpan::Timed { start, end } => (timed(start), timed(end)),
        };

        Self {
            start,
            end,
            summary: summary.into(),
            location: None,
            description: None,
        }
    }

    pub fn start(&self) -> &EventDateTime {
        &self.start
    }

    pub fn end(&self) -> &EventDateTime {
        &self.end
    }

    pub fn is_all_day(&self) -> bool {
        self.start.is_date()
    }
}
