//! Session controller: the per-user `Idle -> Running -> Idle` state machine.
//!
//! The controller owns every piece of per-user runtime state (live sessions,
//! rest periods, notification flags, lunch confirmations) and talks to the
//! outside world only through injected collaborators: a [`SessionStore`],
//! a [`UserDirectory`], a [`Clock`], a [`PromptProvider`] and an optional
//! [`EventSink`].
//!
//! ## Ordering
//!
//! Events are emitted strictly after the state change behind them: the
//! interval is appended before `SessionStopped` goes out, and a rest period
//! is recorded before the block `LimitReached` event. A failed append does
//! not undo the stop; it is reported in [`StopOutcome::persist_error`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::SessionError;
use crate::events::Event;
use crate::gate::{GateEvaluator, LunchConfirmations, PromptProvider};
use crate::limits::{LimitMonitor, NotificationFlags, UsageSnapshot};
use crate::notify::EventSink;
use crate::rest::RestTracker;
use crate::session::{IntervalRecord, LiveSession, SessionInterval, SessionLog};
use crate::storage::{SessionStore, UserDirectory};
use crate::user::{User, UserId};

/// Controller shared between a front-end and its background ticker.
pub type SharedController = Arc<Mutex<SessionController>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerState {
    Idle,
    Running,
}

/// Returned by a successful start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionHandle {
    pub user_id: UserId,
    pub started_at: NaiveDateTime,
}

/// Result of a stop. The stop itself always takes effect.
#[derive(Debug, Clone)]
pub struct StopOutcome {
    pub record: IntervalRecord,
    /// Events raised by this stop, in emission order.
    pub events: Vec<Event>,
    /// Set when the interval could not be saved.
    pub persist_error: Option<SessionError>,
}

impl StopOutcome {
    pub fn is_persisted(&self) -> bool {
        self.persist_error.is_none()
    }
}

/// Point-in-time usage for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageStatus {
    pub user_id: UserId,
    pub state: ControllerState,
    pub live_elapsed_secs: i64,
    pub daily_used_secs: i64,
    pub daily_limit_secs: Option<i64>,
    /// `None` when there is no daily limit.
    pub daily_remaining_secs: Option<i64>,
    pub block_used_secs: i64,
    pub block_limit_secs: Option<i64>,
    pub resting: bool,
    pub rest_remaining_secs: i64,
}

impl UsageStatus {
    pub fn block_remaining_secs(&self) -> Option<i64> {
        self.block_limit_secs
            .map(|limit| (limit - self.block_used_secs).max(0))
    }
}

/// Per-user state that can be carried across process restarts.
/// Live sessions are not included.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineSnapshot {
    #[serde(default)]
    pub rest: RestTracker,
    #[serde(default)]
    pub flags: NotificationFlags,
    #[serde(default)]
    pub lunch: LunchConfirmations,
}

#[derive(Debug, Default)]
struct EngineState {
    live: HashMap<UserId, LiveSession>,
    rest: RestTracker,
    flags: NotificationFlags,
    lunch: LunchConfirmations,
}

pub struct SessionController {
    store: Arc<dyn SessionStore>,
    users: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
    prompts: Box<dyn PromptProvider>,
    events: Option<Arc<dyn EventSink>>,
    monitor: LimitMonitor,
    state: EngineState,
}

impl SessionController {
    pub fn new(
        store: Arc<dyn SessionStore>,
        users: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
        prompts: Box<dyn PromptProvider>,
    ) -> Self {
        Self {
            store,
            users,
            clock,
            prompts,
            events: None,
            monitor: LimitMonitor::default(),
            state: EngineState::default(),
        }
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Rest length for kids without their own `rest_minutes`.
    pub fn with_default_rest_minutes(mut self, minutes: u32) -> Self {
        self.monitor = LimitMonitor::new(minutes);
        self
    }

    /// Resume from a previously saved snapshot.
    pub fn with_snapshot(mut self, snapshot: EngineSnapshot) -> Self {
        self.state.rest = snapshot.rest;
        self.state.flags = snapshot.flags;
        self.state.lunch = snapshot.lunch;
        self
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            rest: self.state.rest.clone(),
            flags: self.state.flags.clone(),
            lunch: self.state.lunch.clone(),
        }
    }

    pub fn into_shared(self) -> SharedController {
        Arc::new(Mutex::new(self))
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn state(&self, user_id: &UserId) -> ControllerState {
        if self.state.live.contains_key(user_id) {
            ControllerState::Running
        } else {
            ControllerState::Idle
        }
    }

    pub fn live_session(&self, user_id: &UserId) -> Option<LiveSession> {
        self.state.live.get(user_id).copied()
    }

    pub fn rest_tracker(&self) -> &RestTracker {
        &self.state.rest
    }

    pub fn lunch_confirmed_on(&self, user_id: &UserId) -> Option<NaiveDate> {
        self.state.lunch.confirmed_on(user_id)
    }

    pub fn sessions(&self, user_id: &UserId) -> Result<SessionLog, SessionError> {
        self.user(user_id)?;
        self.load_log(user_id)
    }

    /// Usage snapshot without running any limit checks.
    pub fn status(&self, user_id: &UserId) -> Result<UsageStatus, SessionError> {
        let user = self.user(user_id)?;
        let records = self.store.list_sessions(user_id)?;
        Ok(self.usage_status(&user, &records, self.clock.now()))
    }

    // ── Transitions ─────────────────────────────────────────────────────

    /// Start a session for a kid, running every gate first.
    ///
    /// # Errors
    /// `AlreadyRunning` if a session is live, `Denied` with the gate's reason
    /// if the start is refused.
    pub fn start(&mut self, user_id: &UserId) -> Result<SessionHandle, SessionError> {
        let user = self.kid(user_id)?;
        if self.state.live.contains_key(user_id) {
            return Err(SessionError::AlreadyRunning(user_id.to_string()));
        }

        let now = self.clock.now();
        if let Some(event) = self.monitor.check_rest_ended(&user, now, &mut self.state.rest) {
            self.emit(&event);
        }

        if let Err(denial) = GateEvaluator::evaluate(
            &user,
            now,
            &self.state.rest,
            &mut self.state.lunch,
            self.prompts.as_mut(),
        ) {
            info!(user = %user_id, reason = %denial, "session start refused");
            return Err(denial.into());
        }

        self.state
            .live
            .insert(user_id.clone(), LiveSession { start_time: now });
        info!(user = %user_id, username = %user.username, "session started");
        self.emit(&Event::SessionStarted {
            user_id: user_id.clone(),
            username: user.username.clone(),
            at: now,
        });

        Ok(SessionHandle {
            user_id: user_id.clone(),
            started_at: now,
        })
    }

    /// Stop the live session, record it, then run the limit checks.
    ///
    /// # Errors
    /// Only `NotRunning`. Persistence failures are reported through
    /// [`StopOutcome::persist_error`] because the stop has already happened.
    pub fn stop(&mut self, user_id: &UserId) -> Result<StopOutcome, SessionError> {
        let live = self
            .state
            .live
            .remove(user_id)
            .ok_or_else(|| SessionError::NotRunning(user_id.to_string()))?;

        let now = self.clock.now().max(live.start_time);
        let interval = SessionInterval::new(live.start_time, now)?;
        let record = interval.to_record();
        let mut events = Vec::new();

        let (records, persist_error) = match self.store.list_sessions(user_id) {
            Ok(existing) => {
                let mut log = SessionLog::new(existing);
                let saved = log
                    .check_insert(&interval)
                    .and_then(|()| self.store.append_session(user_id, &record));
                match saved {
                    Ok(()) => {
                        let mut records = log.into_records();
                        records.push(record.clone());
                        (records, None)
                    }
                    Err(err @ SessionError::OverlapRejected { .. }) => (log.into_records(), Some(err)),
                    Err(err) => {
                        // Not durable, but the time was still played.
                        let mut records = log.into_records();
                        records.push(record.clone());
                        (records, Some(err))
                    }
                }
            }
            Err(err) => (vec![record.clone()], Some(err)),
        };

        match &persist_error {
            None => info!(user = %user_id, duration = %record.duration, "session stopped"),
            Some(err) => warn!(user = %user_id, error = %err, "session stopped but not saved"),
        }

        let user = match self.user(user_id) {
            Ok(user) => Some(user),
            Err(err) => {
                warn!(user = %user_id, error = %err, "user lookup failed after stop; limit checks skipped");
                None
            }
        };
        let username = user
            .as_ref()
            .map_or_else(|| user_id.to_string(), |u| u.username.clone());

        events.push(Event::SessionStopped {
            user_id: user_id.clone(),
            username,
            duration: record.duration.clone(),
            at: now,
        });

        if let Some(user) = &user {
            let usage = UsageSnapshot {
                records: &records,
                live: None,
                now,
            };
            events.extend(self.monitor.check_daily_limit(user, &usage, &mut self.state.flags));
            events.extend(self.monitor.check_block_limit(
                user,
                &usage,
                &mut self.state.rest,
                &mut self.state.flags,
            ));
        }

        for event in &events {
            self.emit(event);
        }

        Ok(StopOutcome {
            record,
            events,
            persist_error,
        })
    }

    /// Periodic re-evaluation while the app is open.
    ///
    /// Runs the rest-ended, daily and block checks against the persisted log
    /// plus the live session, and returns the resulting usage.
    pub fn tick(&mut self, user_id: &UserId) -> Result<UsageStatus, SessionError> {
        let user = self.kid(user_id)?;
        let records = self.store.list_sessions(user_id)?;
        let now = self.clock.now();
        let live = self.state.live.get(user_id).copied();

        let mut events = Vec::new();
        events.extend(self.monitor.check_rest_ended(&user, now, &mut self.state.rest));

        let usage = UsageSnapshot {
            records: &records,
            live: live.as_ref(),
            now,
        };
        events.extend(self.monitor.check_daily_limit(&user, &usage, &mut self.state.flags));
        events.extend(self.monitor.check_block_limit(
            &user,
            &usage,
            &mut self.state.rest,
            &mut self.state.flags,
        ));

        for event in &events {
            self.emit(event);
        }
        Ok(self.usage_status(&user, &records, now))
    }

    // ── Log maintenance ─────────────────────────────────────────────────

    /// Back-enter a session for `date`. A stop earlier than the start is
    /// taken to be on the next day.
    pub fn add_manual_entry(
        &mut self,
        user_id: &UserId,
        date: NaiveDate,
        start: &str,
        stop: &str,
    ) -> Result<IntervalRecord, SessionError> {
        self.user(user_id)?;
        let interval = SessionInterval::manual(date, start, stop)?;
        self.reject_live_overlap(user_id, &interval)?;

        let mut log = self.load_log(user_id)?;
        let record = log.push(interval)?.clone();
        self.store.append_session(user_id, &record)?;
        info!(user = %user_id, start = %record.start, duration = %record.duration, "manual entry added");
        Ok(record)
    }

    /// Rewrite the entry at `index` (log order).
    ///
    /// `start`/`stop` use the stored timestamp format and `duration` is
    /// `HH:MM:SS`. The strings are validated and then stored as given, so the
    /// duration is not recomputed from the bounds.
    pub fn edit_entry(
        &mut self,
        user_id: &UserId,
        index: usize,
        start: &str,
        stop: &str,
        duration: &str,
    ) -> Result<IntervalRecord, SessionError> {
        self.user(user_id)?;
        let record = IntervalRecord {
            start: start.trim().to_string(),
            stop: stop.trim().to_string(),
            duration: duration.trim().to_string(),
        };
        let interval = record.parse()?;
        self.reject_live_overlap(user_id, &interval)?;

        let mut log = self.load_log(user_id)?;
        log.replace(index, record.clone())?;
        self.store.replace_sessions(user_id, log.entries())?;
        debug!(user = %user_id, index, duration = %record.duration, "entry edited");
        Ok(record)
    }

    pub fn delete_entry(&mut self, user_id: &UserId, index: usize) -> Result<IntervalRecord, SessionError> {
        self.user(user_id)?;
        let mut log = self.load_log(user_id)?;
        let removed = log.remove(index)?;
        self.store.replace_sessions(user_id, log.entries())?;
        info!(user = %user_id, index, start = %removed.start, "entry deleted");
        Ok(removed)
    }

    /// Delete every entry for `user_id`. Returns how many were removed.
    pub fn clear_entries(&mut self, user_id: &UserId) -> Result<usize, SessionError> {
        self.user(user_id)?;
        let count = self.store.list_sessions(user_id)?.len();
        self.store.replace_sessions(user_id, &[])?;
        info!(user = %user_id, count, "session log cleared");
        Ok(count)
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn user(&self, user_id: &UserId) -> Result<User, SessionError> {
        self.users
            .get_user(user_id)?
            .ok_or_else(|| SessionError::UnknownUser(user_id.to_string()))
    }

    fn kid(&self, user_id: &UserId) -> Result<User, SessionError> {
        let user = self.user(user_id)?;
        if !user.is_kid() {
            return Err(SessionError::NotAKid(user_id.to_string()));
        }
        Ok(user)
    }

    fn load_log(&self, user_id: &UserId) -> Result<SessionLog, SessionError> {
        Ok(SessionLog::new(self.store.list_sessions(user_id)?))
    }

    fn reject_live_overlap(
        &self,
        user_id: &UserId,
        interval: &SessionInterval,
    ) -> Result<(), SessionError> {
        let Some(live) = self.state.live.get(user_id) else {
            return Ok(());
        };
        let now = self.clock.now();
        if interval.overlaps(live.start_time, now) {
            let fmt = crate::session::TIMESTAMP_FORMAT;
            return Err(SessionError::OverlapRejected {
                start: live.start_time.format(fmt).to_string(),
                stop: now.format(fmt).to_string(),
            });
        }
        Ok(())
    }

    fn usage_status(&self, user: &User, records: &[IntervalRecord], now: NaiveDateTime) -> UsageStatus {
        let live = self.state.live.get(&user.id);
        let usage = UsageSnapshot { records, live, now };
        let daily_used_secs = usage.daily_seconds();
        let daily_limit_secs = user.rules.max_daily_minutes.map(|m| i64::from(m) * 60);

        UsageStatus {
            user_id: user.id.clone(),
            state: self.state(&user.id),
            live_elapsed_secs: live.map_or(0, |l| l.elapsed_secs(now)),
            daily_used_secs,
            daily_limit_secs,
            daily_remaining_secs: daily_limit_secs.map(|limit| (limit - daily_used_secs).max(0)),
            block_used_secs: usage.block_seconds(&user.id, &self.state.rest),
            block_limit_secs: user.rules.max_session_minutes.map(|m| i64::from(m) * 60),
            resting: self.state.rest.is_resting(&user.id, now),
            rest_remaining_secs: self.state.rest.remaining_seconds(&user.id, now),
        }
    }

    fn emit(&self, event: &Event) {
        if let Some(sink) = &self.events {
            sink.emit(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::{GateDenial, ValidationError};
    use crate::events::LimitKind;
    use crate::gate::RoutineQuestion;
    use crate::notify::EventBuffer;
    use crate::storage::MemoryStore;
    use crate::user::BudgetRules;
    use chrono::Duration;

    struct AlwaysYes;

    impl PromptProvider for AlwaysYes {
        fn ask(&mut self, _user: &User, _question: RoutineQuestion) -> bool {
            true
        }
    }

    /// Store whose writes always fail.
    struct ReadOnlyStore;

    impl SessionStore for ReadOnlyStore {
        fn append_session(&self, _: &UserId, _: &IntervalRecord) -> Result<(), SessionError> {
            Err(SessionError::PersistenceUnavailable("disk full".into()))
        }
        fn list_sessions(&self, _: &UserId) -> Result<Vec<IntervalRecord>, SessionError> {
            Ok(Vec::new())
        }
        fn replace_sessions(&self, _: &UserId, _: &[IntervalRecord]) -> Result<(), SessionError> {
            Err(SessionError::PersistenceUnavailable("disk full".into()))
        }
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn sam() -> UserId {
        UserId::parse("kid-1").unwrap()
    }

    struct Harness {
        controller: SessionController,
        clock: Arc<ManualClock>,
        store: Arc<MemoryStore>,
        events: Arc<EventBuffer>,
    }

    fn harness(rules: BudgetRules) -> Harness {
        let user = User {
            rules,
            ..User::kid(sam(), "Sam")
        };
        let parent = User::parent(UserId::parse("mom").unwrap(), "Mom");
        let store = Arc::new(MemoryStore::with_users([user, parent]));
        let clock = Arc::new(ManualClock::new(at(14, 0)));
        let events = Arc::new(EventBuffer::new());
        let controller = SessionController::new(store.clone(), store.clone(), clock.clone(), Box::new(AlwaysYes))
            .with_event_sink(events.clone());
        Harness {
            controller,
            clock,
            store,
            events,
        }
    }

    #[test]
    fn start_stop_records_exact_duration() {
        let mut h = harness(BudgetRules::default());
        h.controller.start(&sam()).unwrap();
        assert_eq!(h.controller.state(&sam()), ControllerState::Running);

        h.clock.advance(Duration::seconds(45 * 60 + 7));
        let outcome = h.controller.stop(&sam()).unwrap();
        assert!(outcome.is_persisted());
        assert_eq!(outcome.record.duration, "00:45:07");
        assert_eq!(h.controller.state(&sam()), ControllerState::Idle);

        let stored = h.store.list_sessions(&sam()).unwrap();
        assert_eq!(stored, vec![outcome.record]);
        assert_eq!(stored[0].duration_secs(), Some(45 * 60 + 7));
    }

    #[test]
    fn double_start_and_stray_stop_are_rejected() {
        let mut h = harness(BudgetRules::default());
        assert_eq!(
            h.controller.stop(&sam()).unwrap_err(),
            SessionError::NotRunning("kid-1".into())
        );
        h.controller.start(&sam()).unwrap();
        assert_eq!(
            h.controller.start(&sam()).unwrap_err(),
            SessionError::AlreadyRunning("kid-1".into())
        );
    }

    #[test]
    fn parents_and_strangers_cannot_start() {
        let mut h = harness(BudgetRules::default());
        assert!(matches!(
            h.controller.start(&UserId::parse("mom").unwrap()),
            Err(SessionError::NotAKid(_))
        ));
        assert!(matches!(
            h.controller.start(&UserId::parse("nobody").unwrap()),
            Err(SessionError::UnknownUser(_))
        ));
    }

    #[test]
    fn events_follow_start_and_stop() {
        let mut h = harness(BudgetRules::default());
        h.controller.start(&sam()).unwrap();
        h.clock.advance(Duration::minutes(10));
        h.controller.stop(&sam()).unwrap();

        let events = h.events.take();
        assert!(matches!(events[0], Event::SessionStarted { .. }));
        assert!(matches!(
            &events[1],
            Event::SessionStopped { duration, .. } if duration == "00:10:00"
        ));
    }

    #[test]
    fn failed_save_still_stops_the_timer() {
        let store = Arc::new(MemoryStore::with_users([User::kid(sam(), "Sam")]));
        let clock = Arc::new(ManualClock::new(at(14, 0)));
        let mut controller = SessionController::new(
            Arc::new(ReadOnlyStore),
            store,
            clock.clone(),
            Box::new(AlwaysYes),
        );
        controller.start(&sam()).unwrap();
        clock.advance(Duration::minutes(5));

        let outcome = controller.stop(&sam()).unwrap();
        assert!(matches!(
            outcome.persist_error,
            Some(SessionError::PersistenceUnavailable(_))
        ));
        assert_eq!(controller.state(&sam()), ControllerState::Idle);
    }

    #[test]
    fn tick_fires_daily_limit_once_during_live_session() {
        let mut h = harness(BudgetRules {
            max_daily_minutes: Some(30),
            ..BudgetRules::default()
        });
        h.controller.start(&sam()).unwrap();

        h.clock.advance(Duration::minutes(20));
        let status = h.controller.tick(&sam()).unwrap();
        assert_eq!(status.daily_remaining_secs, Some(600));

        h.clock.advance(Duration::minutes(15));
        let status = h.controller.tick(&sam()).unwrap();
        assert_eq!(status.daily_remaining_secs, Some(0));
        h.clock.advance(Duration::minutes(1));
        h.controller.tick(&sam()).unwrap();

        let daily: Vec<_> = h
            .events
            .take()
            .into_iter()
            .filter(|e| matches!(e, Event::LimitReached { kind: LimitKind::Daily, .. }))
            .collect();
        assert_eq!(daily.len(), 1);
    }

    #[test]
    fn rest_blocks_start_then_ends_with_event() {
        let mut h = harness(BudgetRules {
            max_session_minutes: Some(30),
            rest_minutes: Some(20),
            ..BudgetRules::default()
        });
        h.controller.start(&sam()).unwrap();
        h.clock.advance(Duration::minutes(30));
        let outcome = h.controller.stop(&sam()).unwrap();
        assert!(outcome
            .events
            .iter()
            .any(|e| matches!(e, Event::LimitReached { kind: LimitKind::Block, .. })));

        h.clock.advance(Duration::minutes(5));
        assert_eq!(
            h.controller.start(&sam()).unwrap_err(),
            SessionError::Denied(GateDenial::Resting { remaining_secs: 15 * 60 })
        );

        h.clock.advance(Duration::minutes(15));
        h.events.take();
        h.controller.start(&sam()).unwrap();
        let events = h.events.take();
        assert!(matches!(events[0], Event::RestEnded { .. }));
        assert!(matches!(events[1], Event::SessionStarted { .. }));
        assert!(h.controller.rest_tracker().get(&sam()).is_none());
    }

    #[test]
    fn manual_entry_wraps_overnight_and_rejects_overlap() {
        let mut h = harness(BudgetRules::default());
        let day = at(0, 0).date();
        let record = h.controller.add_manual_entry(&sam(), day, "23:30", "00:15").unwrap();
        assert_eq!(record.stop, "2024-05-02 00:15:00");
        assert_eq!(record.duration, "00:45:00");

        let err = h.controller.add_manual_entry(&sam(), day, "23:00", "23:45").unwrap_err();
        assert!(matches!(err, SessionError::OverlapRejected { .. }));
        assert_eq!(h.controller.sessions(&sam()).unwrap().len(), 1);
    }

    #[test]
    fn manual_entry_cannot_overlap_the_live_session() {
        let mut h = harness(BudgetRules::default());
        h.controller.start(&sam()).unwrap();
        h.clock.advance(Duration::minutes(30));
        let err = h
            .controller
            .add_manual_entry(&sam(), at(0, 0).date(), "14:10", "14:20")
            .unwrap_err();
        assert!(matches!(err, SessionError::OverlapRejected { .. }));
    }

    #[test]
    fn edit_keeps_given_duration_and_checks_others() {
        let mut h = harness(BudgetRules::default());
        let day = at(0, 0).date();
        h.controller.add_manual_entry(&sam(), day, "09:00", "10:00").unwrap();
        h.controller.add_manual_entry(&sam(), day, "11:00", "12:00").unwrap();

        let edited = h
            .controller
            .edit_entry(&sam(), 0, "2024-05-01 09:00:00", "2024-05-01 10:30:00", "01:00:00")
            .unwrap();
        assert_eq!(edited.duration, "01:00:00");

        let err = h
            .controller
            .edit_entry(&sam(), 0, "2024-05-01 09:00:00", "2024-05-01 11:30:00", "02:30:00")
            .unwrap_err();
        assert!(matches!(err, SessionError::OverlapRejected { .. }));

        let err = h
            .controller
            .edit_entry(&sam(), 1, "2024-05-01 12:00:00", "2024-05-01 11:00:00", "01:00:00")
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Validation(ValidationError::InvalidTimeRange { .. })
        ));
    }

    #[test]
    fn edit_stores_the_callers_text() {
        let mut h = harness(BudgetRules::default());
        h.controller
            .add_manual_entry(&sam(), at(0, 0).date(), "09:00", "10:00")
            .unwrap();

        let edited = h
            .controller
            .edit_entry(&sam(), 0, " 2024-05-01 09:00:00 ", "2024-05-01 10:00:00", "0:75:00")
            .unwrap();
        assert_eq!(edited.start, "2024-05-01 09:00:00");
        assert_eq!(edited.duration, "0:75:00");

        let log = h.controller.sessions(&sam()).unwrap();
        assert_eq!(log.entries()[0], edited);
        assert_eq!(h.controller.status(&sam()).unwrap().daily_used_secs, 75 * 60);
    }

    #[test]
    fn delete_and_clear() {
        let mut h = harness(BudgetRules::default());
        let day = at(0, 0).date();
        h.controller.add_manual_entry(&sam(), day, "09:00", "10:00").unwrap();
        h.controller.add_manual_entry(&sam(), day, "11:00", "12:00").unwrap();

        let removed = h.controller.delete_entry(&sam(), 0).unwrap();
        assert_eq!(removed.start, "2024-05-01 09:00:00");
        assert_eq!(h.controller.clear_entries(&sam()).unwrap(), 1);
        assert!(h.controller.sessions(&sam()).unwrap().is_empty());
    }

    #[test]
    fn snapshot_carries_rest_into_a_new_controller() {
        let mut h = harness(BudgetRules {
            max_session_minutes: Some(30),
            ..BudgetRules::default()
        });
        h.controller.start(&sam()).unwrap();
        h.clock.advance(Duration::minutes(30));
        h.controller.stop(&sam()).unwrap();

        let json = serde_json::to_string(&h.controller.snapshot()).unwrap();
        let restored: EngineSnapshot = serde_json::from_str(&json).unwrap();

        let mut fresh = SessionController::new(
            h.store.clone(),
            h.store.clone(),
            h.clock.clone(),
            Box::new(AlwaysYes),
        )
        .with_snapshot(restored);
        assert!(matches!(
            fresh.start(&sam()),
            Err(SessionError::Denied(GateDenial::Resting { .. }))
        ));
    }

    #[test]
    fn status_reports_block_and_daily_usage() {
        let mut h = harness(BudgetRules {
            max_session_minutes: Some(60),
            max_daily_minutes: Some(120),
            ..BudgetRules::default()
        });
        h.controller
            .add_manual_entry(&sam(), at(0, 0).date(), "10:00", "10:40")
            .unwrap();
        h.controller.start(&sam()).unwrap();
        h.clock.advance(Duration::minutes(5));

        let status = h.controller.status(&sam()).unwrap();
        assert_eq!(status.state, ControllerState::Running);
        assert_eq!(status.live_elapsed_secs, 300);
        assert_eq!(status.daily_used_secs, 45 * 60);
        assert_eq!(status.daily_remaining_secs, Some(75 * 60));
        assert_eq!(status.block_remaining_secs(), Some(15 * 60));
        assert!(!status.resting);
    }
}
