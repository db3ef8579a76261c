//! Integration tests for the SQLite store behind the controller.
//!
//! Uses an on-disk database so the log is checked across reopen.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use gamesentry_core::{
    BudgetRules, Database, ManualClock, PromptProvider, RoutineQuestion, SessionController,
    SessionStore, User, UserDirectory, UserId,
};

struct Yes;

impl PromptProvider for Yes {
    fn ask(&mut self, _: &User, _: RoutineQuestion) -> bool {
        true
    }
}

fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

#[test]
fn test_sessions_survive_reopen_in_insertion_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gamesentry.db");
    let id = UserId::parse("kid-1").unwrap();

    {
        let db = Arc::new(Database::open_at(&path).unwrap());
        db.insert_user(&User {
            rules: BudgetRules {
                max_daily_minutes: Some(90),
                ..BudgetRules::default()
            },
            ..User::kid(id.clone(), "Sam")
        })
        .unwrap();

        let clock = Arc::new(ManualClock::new(at(16, 0)));
        let mut controller = SessionController::new(db.clone(), db.clone(), clock.clone(), Box::new(Yes));
        controller.start(&id).unwrap();
        clock.advance(Duration::seconds(20 * 60 + 30));
        let outcome = controller.stop(&id).unwrap();
        assert!(outcome.is_persisted());

        controller
            .add_manual_entry(&id, at(0, 0).date(), "09:00", "09:45")
            .unwrap();
    }

    let db = Database::open_at(&path).unwrap();
    let sessions = db.list_sessions(&id).unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].start, "2024-05-01 16:00:00");
    assert_eq!(sessions[0].stop, "2024-05-01 16:20:30");
    assert_eq!(sessions[0].duration, "00:20:30");
    assert_eq!(sessions[1].duration, "00:45:00");

    let user = db.get_user(&id).unwrap().unwrap();
    assert_eq!(user.rules.max_daily_minutes, Some(90));
}

#[test]
fn test_edit_and_delete_rewrite_the_stored_log() {
    let db = Arc::new(Database::open_memory().unwrap());
    let id = UserId::parse("kid-1").unwrap();
    db.insert_user(&User::kid(id.clone(), "Sam")).unwrap();

    let clock = Arc::new(ManualClock::new(at(20, 0)));
    let mut controller = SessionController::new(db.clone(), db.clone(), clock, Box::new(Yes));
    let day = at(0, 0).date();
    controller.add_manual_entry(&id, day, "10:00", "11:00").unwrap();
    controller.add_manual_entry(&id, day, "12:00", "12:30").unwrap();
    controller.add_manual_entry(&id, day, "14:00", "15:00").unwrap();

    controller
        .edit_entry(&id, 1, "2024-05-01 12:00:00", "2024-05-01 12:30:00", "00:20:00")
        .unwrap();
    controller.delete_entry(&id, 0).unwrap();

    let stored = db.list_sessions(&id).unwrap();
    let durations: Vec<&str> = stored.iter().map(|r| r.duration.as_str()).collect();
    assert_eq!(durations, vec!["00:20:00", "01:00:00"]);

    // Usage honours the edited duration, not stop - start.
    let status = controller.status(&id).unwrap();
    assert_eq!(status.daily_used_secs, 80 * 60);
}

#[test]
fn test_deleting_a_user_drops_their_log() {
    let db = Database::open_memory().unwrap();
    let id = UserId::parse("kid-1").unwrap();
    db.insert_user(&User::kid(id.clone(), "Sam")).unwrap();
    db.replace_sessions(
        &id,
        &[gamesentry_core::IntervalRecord {
            start: "2024-05-01 10:00:00".into(),
            stop: "2024-05-01 10:30:00".into(),
            duration: "00:30:00".into(),
        }],
    )
    .unwrap();

    assert!(db.delete_user(&id).unwrap());
    assert!(db.list_sessions(&id).unwrap().is_empty());
    assert!(db.list_users().unwrap().is_empty());
}
