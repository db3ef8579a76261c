//! Session start gate.
//!
//! Decides whether a kid may start playing right now. Checks run in order:
//!
//! 1. **Rest**: an active rest period refuses the start outright.
//! 2. **Routine**: inside the lunch window, lunch and teeth-brushing must be
//!    confirmed through the injected [`PromptProvider`]. A malformed lunch
//!    window disables this check (fails open).
//! 3. **Allowed hours**: the current time-of-day must fall in the configured
//!    window, which may wrap past midnight. Malformed bounds refuse the start
//!    (fails closed).

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GateDenial;
use crate::rest::RestTracker;
use crate::user::{parse_hhmm, User, UserId};

/// Questions asked during the lunch routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineQuestion {
    /// "Have you had lunch yet?"
    Lunch,
    /// "Have you brushed your teeth?" `after_lunch` is set when it directly
    /// follows a fresh lunch confirmation.
    Teeth { after_lunch: bool },
}

impl RoutineQuestion {
    pub fn title(self) -> &'static str {
        match self {
            RoutineQuestion::Lunch => "Lunch Time!",
            RoutineQuestion::Teeth { .. } => "Brush Your Teeth!",
        }
    }

    pub fn prompt(self) -> &'static str {
        match self {
            RoutineQuestion::Lunch => "Have you had lunch yet?",
            RoutineQuestion::Teeth { after_lunch: true } => "Great! Now, have you brushed your teeth?",
            RoutineQuestion::Teeth { after_lunch: false } => "Have you brushed your teeth?",
        }
    }
}

/// Yes/no prompt capability, supplied by whatever UI is driving the engine.
pub trait PromptProvider: Send {
    fn ask(&mut self, user: &User, question: RoutineQuestion) -> bool;
}

/// Day on which each user last confirmed lunch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LunchConfirmations {
    confirmed: HashMap<UserId, NaiveDate>,
}

impl LunchConfirmations {
    pub fn confirmed_on(&self, user: &UserId) -> Option<NaiveDate> {
        self.confirmed.get(user).copied()
    }

    pub fn is_confirmed(&self, user: &UserId, day: NaiveDate) -> bool {
        self.confirmed_on(user) == Some(day)
    }

    pub fn confirm(&mut self, user: &UserId, day: NaiveDate) {
        self.confirmed.insert(user.clone(), day);
    }
}

pub struct GateEvaluator;

impl GateEvaluator {
    /// Run every gate for `user` at `now`.
    pub fn evaluate(
        user: &User,
        now: NaiveDateTime,
        rest: &RestTracker,
        lunch: &mut LunchConfirmations,
        prompts: &mut dyn PromptProvider,
    ) -> Result<(), GateDenial> {
        if rest.is_resting(&user.id, now) {
            return Err(GateDenial::Resting {
                remaining_secs: rest.remaining_seconds(&user.id, now),
            });
        }
        Self::routine_gate(user, now, lunch, prompts)?;
        Self::allowed_hours_gate(user, now.time())
    }

    /// Lunch/teeth routine. Only active inside the user's lunch window.
    pub fn routine_gate(
        user: &User,
        now: NaiveDateTime,
        lunch: &mut LunchConfirmations,
        prompts: &mut dyn PromptProvider,
    ) -> Result<(), GateDenial> {
        if !Self::lunch_window_active(user, now.time()) {
            return Ok(());
        }

        let today = now.date();
        if lunch.is_confirmed(&user.id, today) {
            return Self::ask_teeth(user, prompts, false);
        }

        if !prompts.ask(user, RoutineQuestion::Lunch) {
            // Not eaten yet: play is allowed, the question comes back next time.
            debug!(user = %user.id, "lunch not yet eaten; routine skipped");
            return Ok(());
        }
        lunch.confirm(&user.id, today);
        Self::ask_teeth(user, prompts, true)
    }

    /// Allowed-hours window. Absent bounds mean no restriction.
    pub fn allowed_hours_gate(user: &User, time: NaiveTime) -> Result<(), GateDenial> {
        let (start_raw, end_raw) = match (&user.allowed_start_time, &user.allowed_end_time) {
            (None, None) => return Ok(()),
            (start, end) => (
                start.as_deref().unwrap_or_default(),
                end.as_deref().unwrap_or_default(),
            ),
        };

        let start = parse_hhmm(start_raw).ok_or_else(|| GateDenial::InvalidConfiguration {
            field: "allowed_start_time".into(),
            value: start_raw.into(),
        })?;
        let end = parse_hhmm(end_raw).ok_or_else(|| GateDenial::InvalidConfiguration {
            field: "allowed_end_time".into(),
            value: end_raw.into(),
        })?;

        if Self::in_time_range(start, end, time) {
            Ok(())
        } else {
            Err(GateDenial::OutsideAllowedHours {
                start: start_raw.into(),
                end: end_raw.into(),
            })
        }
    }

    /// Inclusive range check; `start > end` wraps past midnight.
    pub fn in_time_range(start: NaiveTime, end: NaiveTime, now: NaiveTime) -> bool {
        if start <= end {
            start <= now && now <= end
        } else {
            now >= start || now <= end
        }
    }

    /// Whether the routine applies at `time`. Inclusive and never wraps
    /// midnight, so a window whose start is after its end is never active.
    /// Malformed bounds disable it.
    pub fn lunch_window_active(user: &User, time: NaiveTime) -> bool {
        if !user.enforce_lunch_routine {
            return false;
        }
        let (start_raw, end_raw) = user.lunch_window();
        match (parse_hhmm(start_raw), parse_hhmm(end_raw)) {
            (Some(start), Some(end)) => start <= time && time <= end,
            _ => {
                debug!(user = %user.id, start_raw, end_raw, "malformed lunch window; routine disabled");
                false
            }
        }
    }

    fn ask_teeth(
        user: &User,
        prompts: &mut dyn PromptProvider,
        after_lunch: bool,
    ) -> Result<(), GateDenial> {
        if prompts.ask(user, RoutineQuestion::Teeth { after_lunch }) {
            Ok(())
        } else {
            Err(GateDenial::RoutineRequired)
        }
    }
}
