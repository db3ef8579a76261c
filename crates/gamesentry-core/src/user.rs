//! User accounts and their budget rules.
//!
//! Users are owned by the configuration store; the engine only reads them.
//! Time-of-day fields stay as the `HH:MM` strings the parent typed so that a
//! malformed value can be reported verbatim and handled per gate (the
//! allowed-hours gate fails closed, the lunch gate fails open).

use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Rest length applied when a kid has no `rest_minutes` configured.
pub const DEFAULT_REST_MINUTES: u32 = 60;
/// Lunch window used when the routine is enforced without explicit bounds.
pub const DEFAULT_LUNCH_START: &str = "12:00";
pub const DEFAULT_LUNCH_END: &str = "13:00";

/// Opaque, stable user identifier.
///
/// Accepts ASCII letters, digits, `-` and `_` only, so ids can be used as
/// storage keys without escaping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        let valid = !raw.is_empty()
            && raw.len() <= 64
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(SessionError::InvalidUserId(raw.to_string()))
        }
    }

    /// Fresh random id for a new account.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for UserId {
    type Error = SessionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Parent,
    Kid,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Parent => "Parent",
            Role::Kid => "Kid",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "parent" => Ok(Role::Parent),
            "kid" => Ok(Role::Kid),
            other => Err(format!("unknown role '{other}' (expected parent or kid)")),
        }
    }
}

/// Play budgets for a kid account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetRules {
    /// Block budget: play allowed before a rest is imposed.
    #[serde(default)]
    pub max_session_minutes: Option<u32>,
    /// Daily budget; `None` means unlimited.
    #[serde(default)]
    pub max_daily_minutes: Option<u32>,
    /// Rest length after a block breach.
    #[serde(default)]
    pub rest_minutes: Option<u32>,
    #[serde(default = "default_true")]
    pub enforce_rest: bool,
}

fn default_true() -> bool {
    true
}

impl Default for BudgetRules {
    fn default() -> Self {
        Self {
            max_session_minutes: None,
            max_daily_minutes: None,
            rest_minutes: None,
            enforce_rest: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    #[serde(default)]
    pub rules: BudgetRules,
    #[serde(default)]
    pub allowed_start_time: Option<String>,
    #[serde(default)]
    pub allowed_end_time: Option<String>,
    #[serde(default)]
    pub enforce_lunch_routine: bool,
    #[serde(default)]
    pub lunch_start_time: Option<String>,
    #[serde(default)]
    pub lunch_end_time: Option<String>,
}

impl User {
    /// A kid with no budgets, no allowed-hours window and no routine.
    pub fn kid(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            role: Role::Kid,
            rules: BudgetRules::default(),
            allowed_start_time: None,
            allowed_end_time: None,
            enforce_lunch_routine: false,
            lunch_start_time: None,
            lunch_end_time: None,
        }
    }

    pub fn parent(id: UserId, username: impl Into<String>) -> Self {
        Self {
            role: Role::Parent,
            ..Self::kid(id, username)
        }
    }

    pub fn is_kid(&self) -> bool {
        self.role == Role::Kid
    }

    /// Lunch window bounds, falling back to 12:00-13:00 when unset.
    pub fn lunch_window(&self) -> (&str, &str) {
        (
            self.lunch_start_time.as_deref().unwrap_or(DEFAULT_LUNCH_START),
            self.lunch_end_time.as_deref().unwrap_or(DEFAULT_LUNCH_END),
        )
    }
}

/// Parse a 24-hour `HH:MM` time-of-day.
pub fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    let (h, m) = value.split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return None;
    }
    let hour: u32 = h.parse().ok()?;
    let minute: u32 = m.parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_rejects_malformed_values() {
        assert!(UserId::parse("kid-1").is_ok());
        assert!(UserId::parse("").is_err());
        assert!(UserId::parse("has space").is_err());
        assert!(UserId::parse("../etc").is_err());
    }

    #[test]
    fn generated_ids_are_valid() {
        let id = UserId::generate();
        assert!(UserId::parse(id.as_str()).is_ok());
    }

    #[test]
    fn parse_hhmm_accepts_24h_times() {
        assert_eq!(parse_hhmm("06:00"), NaiveTime::from_hms_opt(6, 0, 0));
        assert_eq!(parse_hhmm("23:59"), NaiveTime::from_hms_opt(23, 59, 0));
        assert_eq!(parse_hhmm("9:30"), NaiveTime::from_hms_opt(9, 30, 0));
    }

    #[test]
    fn parse_hhmm_rejects_garbage() {
        assert!(parse_hhmm("24:00").is_none());
        assert!(parse_hhmm("12:60").is_none());
        assert!(parse_hhmm("noon").is_none());
        assert!(parse_hhmm("12:5").is_none());
        assert!(parse_hhmm("").is_none());
    }

    #[test]
    fn budget_rules_default_to_unlimited_with_rest() {
        let rules = BudgetRules::default();
        assert_eq!(rules.rest_minutes, None);
        assert!(rules.enforce_rest);
    }

    #[test]
    fn user_deserializes_with_defaults() {
        let user: User = serde_json::from_str(
            r#"{"id":"kid-1","username":"Sam","role":"Kid","rules":{"max_daily_minutes":90}}"#,
        )
        .unwrap();
        assert_eq!(user.rules.max_daily_minutes, Some(90));
        assert!(user.rules.enforce_rest);
        assert!(!user.enforce_lunch_routine);
        assert_eq!(user.lunch_window(), ("12:00", "13:00"));
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("KID".parse::<Role>(), Ok(Role::Kid));
        assert_eq!("parent".parse::<Role>(), Ok(Role::Parent));
        assert!("admin".parse::<Role>().is_err());
    }
}
