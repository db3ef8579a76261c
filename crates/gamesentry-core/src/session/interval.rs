//! Completed play intervals and their persisted wire form.
//!
//! ```text
//! { "start": "YYYY-MM-DD HH:MM:SS", "stop": "YYYY-MM-DD HH:MM:SS", "duration": "HH:MM:SS" }
//! ```
//!
//! All values are local time with no offset. The duration string is the
//! source of truth for usage totals so that hand-edited entries are honoured.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::user::parse_hhmm;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A persisted interval exactly as stored.
///
/// Records are kept as strings because stored data may have been edited by
/// hand; readers skip what they cannot parse instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalRecord {
    pub start: String,
    pub stop: String,
    pub duration: String,
}

impl IntervalRecord {
    pub fn start_time(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.start)
    }

    pub fn stop_time(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.stop)
    }

    pub fn duration_secs(&self) -> Option<i64> {
        parse_hms(&self.duration)
    }

    /// Validate the record into a typed interval.
    pub fn parse(&self) -> Result<SessionInterval, ValidationError> {
        let start = self.start_time().ok_or_else(|| invalid("start", &self.start))?;
        let stop = self.stop_time().ok_or_else(|| invalid("stop", &self.stop))?;
        let duration_secs = self
            .duration_secs()
            .ok_or_else(|| invalid("duration", &self.duration))?;
        SessionInterval::with_duration(start, stop, duration_secs)
    }
}

/// A completed play interval. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInterval {
    start: NaiveDateTime,
    stop: NaiveDateTime,
    duration_secs: i64,
}

impl SessionInterval {
    /// Interval whose duration is `stop - start`.
    pub fn new(start: NaiveDateTime, stop: NaiveDateTime) -> Result<Self, ValidationError> {
        Self::with_duration(start, stop, (stop - start).num_seconds())
    }

    /// Interval with an explicitly supplied duration (manual or edited entries).
    pub fn with_duration(
        start: NaiveDateTime,
        stop: NaiveDateTime,
        duration_secs: i64,
    ) -> Result<Self, ValidationError> {
        if start > stop {
            return Err(ValidationError::InvalidTimeRange {
                start: start.format(TIMESTAMP_FORMAT).to_string(),
                stop: stop.format(TIMESTAMP_FORMAT).to_string(),
            });
        }
        if duration_secs < 0 {
            return Err(invalid("duration", &duration_secs.to_string()));
        }
        Ok(Self {
            start,
            stop,
            duration_secs,
        })
    }

    /// Back-entry for a given day. A stop earlier than the start is taken to
    /// fall on the following day.
    pub fn manual(date: NaiveDate, start: &str, stop: &str) -> Result<Self, ValidationError> {
        let start_time = parse_hhmm(start).ok_or_else(|| invalid("start", start))?;
        let stop_time = parse_hhmm(stop).ok_or_else(|| invalid("stop", stop))?;
        let start_dt = date.and_time(start_time);
        let mut stop_dt = date.and_time(stop_time);
        if stop_dt < start_dt {
            stop_dt += Duration::days(1);
        }
        Self::new(start_dt, stop_dt)
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn stop(&self) -> NaiveDateTime {
        self.stop
    }

    pub fn duration_secs(&self) -> i64 {
        self.duration_secs
    }

    /// Half-open overlap: touching intervals do not overlap.
    pub fn overlaps(&self, start: NaiveDateTime, stop: NaiveDateTime) -> bool {
        self.start < stop && self.stop > start
    }

    pub fn to_record(&self) -> IntervalRecord {
        IntervalRecord {
            start: self.start.format(TIMESTAMP_FORMAT).to_string(),
            stop: self.stop.format(TIMESTAMP_FORMAT).to_string(),
            duration: format_hms(self.duration_secs),
        }
    }
}

fn invalid(field: &str, value: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).ok()
}

/// `HH:MM:SS`; hours may exceed 24.
pub fn format_hms(secs: i64) -> String {
    let secs = secs.max(0);
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Parse `HH:MM:SS` into seconds. Each field is a plain non-negative count,
/// so legacy values such as `00:61:00` are read as 61 minutes.
pub fn parse_hms(value: &str) -> Option<i64> {
    let mut parts = value.trim().split(':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let seconds: i64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || hours < 0 || minutes < 0 || seconds < 0 {
        return None;
    }
    Some(hours * 3600 + minutes * 60 + seconds)
}

/// Human-readable remaining time for status displays.
pub fn format_time_remaining(secs: i64) -> String {
    if secs <= 0 {
        "No time left".to_string()
    } else if secs < 3600 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
