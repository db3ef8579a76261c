//! Usage arithmetic over the session log.
//!
//! Totals sum each matching record's stored `HH:MM:SS` duration rather than
//! recomputing `stop - start`, then add the live session's elapsed time when
//! the live session itself falls inside the window.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::interval::IntervalRecord;

/// A session that is currently running and not yet persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveSession {
    pub start_time: NaiveDateTime,
}

impl LiveSession {
    pub fn elapsed_secs(&self, now: NaiveDateTime) -> i64 {
        (now - self.start_time).num_seconds().max(0)
    }
}

/// Predicate over an interval's start timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageWindow {
    /// Started on this calendar day.
    Day(NaiveDate),
    /// Started at or after the boundary.
    Since(NaiveDateTime),
    /// Started on `day` and at or after `boundary`: the current block.
    DaySince {
        day: NaiveDate,
        boundary: NaiveDateTime,
    },
}

impl UsageWindow {
    pub fn contains(&self, start: NaiveDateTime) -> bool {
        match *self {
            UsageWindow::Day(day) => start.date() == day,
            UsageWindow::Since(boundary) => start >= boundary,
            UsageWindow::DaySince { day, boundary } => start.date() == day && start >= boundary,
        }
    }
}

/// Total seconds played inside `window`.
///
/// Records with an unparsable start or duration are skipped.
pub fn total_seconds(
    records: &[IntervalRecord],
    window: &UsageWindow,
    live: Option<&LiveSession>,
    now: NaiveDateTime,
) -> i64 {
    let persisted: i64 = records
        .iter()
        .filter_map(|record| {
            let Some(start) = record.start_time() else {
                warn!(start = %record.start, "skipping interval with malformed start");
                return None;
            };
            if !window.contains(start) {
                return None;
            }
            let duration = record.duration_secs();
            if duration.is_none() {
                warn!(duration = %record.duration, "skipping interval with malformed duration");
            }
            duration
        })
        .sum();

    let live_secs = live
        .filter(|session| window.contains(session.start_time))
        .map_or(0, |session| session.elapsed_secs(now));

    persisted + live_secs
}
