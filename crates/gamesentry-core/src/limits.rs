//! Daily and block budget monitoring.
//!
//! The monitor observes usage and raises events; it never refuses a start by
//! itself. Each limit kind notifies at most once per user per calendar day,
//! tracked by [`NotificationFlags`]. A block breach also starts a rest
//! period, which is what later makes the gate refuse new sessions.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::events::{Event, LimitKind};
use crate::rest::RestTracker;
use crate::session::{total_seconds, IntervalRecord, LiveSession, UsageWindow};
use crate::user::{User, UserId};

/// Per-user, per-day, per-kind "already notified" markers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationFlags {
    flags: HashSet<(UserId, NaiveDate, LimitKind)>,
}

impl NotificationFlags {
    pub fn contains(&self, user: &UserId, day: NaiveDate, kind: LimitKind) -> bool {
        self.flags.contains(&(user.clone(), day, kind))
    }

    pub fn insert(&mut self, user: &UserId, day: NaiveDate, kind: LimitKind) {
        self.flags.insert((user.clone(), day, kind));
    }

    /// Drop flags more than one day older than `today`.
    pub fn purge_stale(&mut self, today: NaiveDate) {
        self.flags
            .retain(|(_, day, _)| (today - *day).num_days() <= 1);
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

/// Usage inputs for one user at one instant.
#[derive(Debug, Clone, Copy)]
pub struct UsageSnapshot<'a> {
    pub records: &'a [IntervalRecord],
    pub live: Option<&'a LiveSession>,
    pub now: NaiveDateTime,
}

impl UsageSnapshot<'_> {
    pub fn daily_seconds(&self) -> i64 {
        total_seconds(
            self.records,
            &UsageWindow::Day(self.now.date()),
            self.live,
            self.now,
        )
    }

    /// Usage in the current block; zero while resting.
    pub fn block_seconds(&self, user: &UserId, rest: &RestTracker) -> i64 {
        if rest.is_resting(user, self.now) {
            return 0;
        }
        let window = UsageWindow::DaySince {
            day: self.now.date(),
            boundary: rest.last_rest_boundary(user, self.now),
        };
        total_seconds(self.records, &window, self.live, self.now)
    }
}

#[derive(Debug, Clone)]
pub struct LimitMonitor {
    default_rest_minutes: u32,
}

impl Default for LimitMonitor {
    fn default() -> Self {
        Self {
            default_rest_minutes: crate::user::DEFAULT_REST_MINUTES,
        }
    }
}

impl LimitMonitor {
    pub fn new(default_rest_minutes: u32) -> Self {
        Self { default_rest_minutes }
    }

    pub fn check_daily_limit(
        &self,
        user: &User,
        usage: &UsageSnapshot<'_>,
        flags: &mut NotificationFlags,
    ) -> Option<Event> {
        let today = usage.now.date();
        flags.purge_stale(today);

        let limit_minutes = user.rules.max_daily_minutes?;
        if flags.contains(&user.id, today, LimitKind::Daily) {
            return None;
        }

        let used = usage.daily_seconds();
        if used < i64::from(limit_minutes) * 60 {
            return None;
        }

        flags.insert(&user.id, today, LimitKind::Daily);
        info!(user = %user.id, limit_minutes, used_secs = used, "daily limit reached");
        Some(Event::LimitReached {
            user_id: user.id.clone(),
            username: user.username.clone(),
            kind: LimitKind::Daily,
            limit_minutes,
            usage_minutes: used / 60,
            rest_minutes: None,
            at: usage.now,
        })
    }

    /// Starts a rest period when the block budget is used up.
    pub fn check_block_limit(
        &self,
        user: &User,
        usage: &UsageSnapshot<'_>,
        rest: &mut RestTracker,
        flags: &mut NotificationFlags,
    ) -> Option<Event> {
        let today = usage.now.date();
        flags.purge_stale(today);

        let limit_minutes = user.rules.max_session_minutes?;
        if !user.rules.enforce_rest || flags.contains(&user.id, today, LimitKind::Block) {
            return None;
        }

        let used = usage.block_seconds(&user.id, rest);
        if used < i64::from(limit_minutes) * 60 {
            return None;
        }

        let rest_minutes = user.rules.rest_minutes.unwrap_or(self.default_rest_minutes);
        rest.start_rest(&user.id, rest_minutes, usage.now);
        flags.insert(&user.id, today, LimitKind::Block);
        info!(user = %user.id, limit_minutes, rest_minutes, used_secs = used, "block limit reached");
        Some(Event::LimitReached {
            user_id: user.id.clone(),
            username: user.username.clone(),
            kind: LimitKind::Block,
            limit_minutes,
            usage_minutes: used / 60,
            rest_minutes: Some(rest_minutes),
            at: usage.now,
        })
    }

    /// Removes an expired rest period. Fires once per rest period.
    pub fn check_rest_ended(
        &self,
        user: &User,
        now: NaiveDateTime,
        rest: &mut RestTracker,
    ) -> Option<Event> {
        let state = rest.get(&user.id)?;
        if state.is_active(now) {
            return None;
        }
        rest.clear(&user.id);
        debug!(user = %user.id, "rest period expired");
        Some(Event::RestEnded {
            user_id: user.id.clone(),
            username: user.username.clone(),
            at: now,
        })
    }
}
