//! Rest (cooldown) periods imposed after a block budget breach.
//!
//! Expiry is lazy: an entry stays in the tracker after its end has passed,
//! and every query recomputes from the supplied wall-clock time. The limit
//! monitor removes expired entries as an explicit transition. The end of a
//! removed rest is kept as the block boundary so usage before the rest is
//! not counted again.

use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::user::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestState {
    pub start_time: NaiveDateTime,
    pub duration_minutes: u32,
}

impl RestState {
    pub fn ends_at(&self) -> NaiveDateTime {
        self.start_time + Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn is_active(&self, now: NaiveDateTime) -> bool {
        now < self.ends_at()
    }

    pub fn remaining_secs(&self, now: NaiveDateTime) -> i64 {
        (self.ends_at() - now).num_seconds().max(0)
    }
}

/// At most one rest period per user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestTracker {
    #[serde(default)]
    periods: HashMap<UserId, RestState>,
    #[serde(default)]
    last_ended: HashMap<UserId, NaiveDateTime>,
}

impl RestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) a rest period beginning at `now`.
    pub fn start_rest(&mut self, user: &UserId, minutes: u32, now: NaiveDateTime) -> RestState {
        let state = RestState {
            start_time: now,
            duration_minutes: minutes,
        };
        self.periods.insert(user.clone(), state);
        info!(user = %user, minutes, "rest period started");
        state
    }

    pub fn is_resting(&self, user: &UserId, now: NaiveDateTime) -> bool {
        self.periods.get(user).is_some_and(|rest| rest.is_active(now))
    }

    pub fn remaining_seconds(&self, user: &UserId, now: NaiveDateTime) -> i64 {
        self.periods
            .get(user)
            .map_or(0, |rest| rest.remaining_secs(now))
    }

    /// End of the most recent rest, or midnight of `now`'s day when there is
    /// none. Block usage is counted from this boundary.
    pub fn last_rest_boundary(&self, user: &UserId, now: NaiveDateTime) -> NaiveDateTime {
        let midnight = now.date().and_time(chrono::NaiveTime::MIN);
        match self.periods.get(user) {
            Some(rest) => rest.ends_at(),
            None => self
                .last_ended
                .get(user)
                .copied()
                .filter(|end| *end >= midnight)
                .unwrap_or(midnight),
        }
    }

    pub fn get(&self, user: &UserId) -> Option<&RestState> {
        self.periods.get(user)
    }

    /// Remove the user's rest period, remembering when it ended.
    pub fn clear(&mut self, user: &UserId) -> Option<RestState> {
        let removed = self.periods.remove(user)?;
        self.last_ended.insert(user.clone(), removed.ends_at());
        Some(removed)
    }
}
