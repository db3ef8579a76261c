use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::user::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitKind {
    Daily,
    Block,
}

/// Every engine decision that somebody should hear about produces an Event.
/// Events are raised only after the state change behind them is committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        user_id: UserId,
        username: String,
        at: NaiveDateTime,
    },
    SessionStopped {
        user_id: UserId,
        username: String,
        /// `HH:MM:SS`, as persisted.
        duration: String,
        at: NaiveDateTime,
    },
    LimitReached {
        user_id: UserId,
        username: String,
        kind: LimitKind,
        limit_minutes: u32,
        usage_minutes: i64,
        /// Only set for block limits: the rest period that was started.
        rest_minutes: Option<u32>,
        at: NaiveDateTime,
    },
    RestEnded {
        user_id: UserId,
        username: String,
        at: NaiveDateTime,
    },
}

impl Event {
    pub fn user_id(&self) -> &UserId {
        match self {
            Event::SessionStarted { user_id, .. }
            | Event::SessionStopped { user_id, .. }
            | Event::LimitReached { user_id, .. }
            | Event::RestEnded { user_id, .. } => user_id,
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Event::SessionStarted { username, .. }
            | Event::SessionStopped { username, .. }
            | Event::LimitReached { username, .. }
            | Event::RestEnded { username, .. } => username,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn limit_event_serializes_with_tag() {
        let event = Event::LimitReached {
            user_id: UserId::parse("kid-1").unwrap(),
            username: "Sam".into(),
            kind: LimitKind::Block,
            limit_minutes: 120,
            usage_minutes: 125,
            rest_minutes: Some(60),
            at: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(17, 5, 0)
                .unwrap(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "limit_reached");
        assert_eq!(json["kind"], "block");
        assert_eq!(json["user_id"], "kid-1");
        assert_eq!(event.username(), "Sam");
    }
}
