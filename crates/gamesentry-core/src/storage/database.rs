//! SQLite-based user and session storage.
//!
//! Provides persistent storage for:
//! - Parent and kid accounts with their budget rules
//! - Per-user session logs, kept in insertion order
//! - Key-value store for application state

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Local;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use super::data_dir;
use super::migrations;
use super::traits::{SessionStore, UserDirectory};
use crate::error::{DatabaseError, Result, SessionError, ValidationError};
use crate::session::{IntervalRecord, TIMESTAMP_FORMAT};
use crate::user::{BudgetRules, Role, User, UserId};

const USER_COLUMNS: &str = "id, username, role, max_session_minutes, max_daily_minutes, rest_minutes,
     enforce_rest, allowed_start_time, allowed_end_time, enforce_lunch_routine,
     lunch_start_time, lunch_end_time";

/// SQLite database for users and session logs.
///
/// The connection sits behind a mutex so one handle can be shared between
/// the controller and a background ticker.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `~/.config/gamesentry/gamesentry.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, DatabaseError> {
        Self::open_at(&data_dir()?.join("gamesentry.db"))
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "opened database");
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DatabaseError> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::Poisoned)
    }

    // ── Key/value ──────────────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let conn = self.conn()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // ── Users ──────────────────────────────────────────────────────────

    /// Add a new account.
    ///
    /// # Errors
    /// Fails with `InvalidUsername` when the name is blank or already taken
    /// (case-insensitive).
    pub fn insert_user(&self, user: &User) -> Result<()> {
        self.check_username(&user.username, None)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (id, username, role, max_session_minutes, max_daily_minutes,
                rest_minutes, enforce_rest, allowed_start_time, allowed_end_time,
                enforce_lunch_routine, lunch_start_time, lunch_end_time, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                user.id.as_str(),
                user.username.trim(),
                user.role.as_str(),
                user.rules.max_session_minutes,
                user.rules.max_daily_minutes,
                user.rules.rest_minutes,
                user.rules.enforce_rest,
                user.allowed_start_time,
                user.allowed_end_time,
                user.enforce_lunch_routine,
                user.lunch_start_time,
                user.lunch_end_time,
                Local::now().naive_local().format(TIMESTAMP_FORMAT).to_string(),
            ],
        )
        .map_err(DatabaseError::from)?;
        info!(user = %user.id, username = %user.username, role = user.role.as_str(), "user added");
        Ok(())
    }

    /// Overwrite an existing account's settings.
    pub fn update_user(&self, user: &User) -> Result<()> {
        self.check_username(&user.username, Some(&user.id))?;
        let changed = self
            .conn()?
            .execute(
                "UPDATE users SET username = ?2, role = ?3, max_session_minutes = ?4,
                    max_daily_minutes = ?5, rest_minutes = ?6, enforce_rest = ?7,
                    allowed_start_time = ?8, allowed_end_time = ?9,
                    enforce_lunch_routine = ?10, lunch_start_time = ?11, lunch_end_time = ?12
                 WHERE id = ?1",
                params![
                    user.id.as_str(),
                    user.username.trim(),
                    user.role.as_str(),
                    user.rules.max_session_minutes,
                    user.rules.max_daily_minutes,
                    user.rules.rest_minutes,
                    user.rules.enforce_rest,
                    user.allowed_start_time,
                    user.allowed_end_time,
                    user.enforce_lunch_routine,
                    user.lunch_start_time,
                    user.lunch_end_time,
                ],
            )
            .map_err(DatabaseError::from)?;
        if changed == 0 {
            return Err(SessionError::UnknownUser(user.id.to_string()).into());
        }
        Ok(())
    }

    /// Delete an account together with its session log.
    ///
    /// Returns `false` if no such user existed.
    pub fn delete_user(&self, id: &UserId) -> Result<bool, DatabaseError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM sessions WHERE user_id = ?1", params![id.as_str()])?;
        let removed = tx.execute("DELETE FROM users WHERE id = ?1", params![id.as_str()])?;
        tx.commit()?;
        if removed > 0 {
            info!(user = %id, "user deleted");
        }
        Ok(removed > 0)
    }

    pub fn find_user_by_name(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
                params![username.trim()],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Case-insensitive uniqueness check, optionally ignoring one account.
    pub fn is_username_taken(
        &self,
        username: &str,
        exclude: Option<&UserId>,
    ) -> Result<bool, DatabaseError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1 AND id != ?2",
            params![username.trim(), exclude.map_or("", UserId::as_str)],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn check_username(&self, username: &str, exclude: Option<&UserId>) -> Result<()> {
        if username.trim().is_empty() || self.is_username_taken(username, exclude)? {
            return Err(ValidationError::InvalidUsername(username.to_string()).into());
        }
        Ok(())
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    let id = UserId::parse(&id).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let role: String = row.get(2)?;
    let role: Role = role.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, e.into())
    })?;
    Ok(User {
        id,
        username: row.get(1)?,
        role,
        rules: BudgetRules {
            max_session_minutes: row.get(3)?,
            max_daily_minutes: row.get(4)?,
            rest_minutes: row.get(5)?,
            enforce_rest: row.get(6)?,
        },
        allowed_start_time: row.get(7)?,
        allowed_end_time: row.get(8)?,
        enforce_lunch_routine: row.get(9)?,
        lunch_start_time: row.get(10)?,
        lunch_end_time: row.get(11)?,
    })
}

fn persistence(err: rusqlite::Error) -> SessionError {
    DatabaseError::from(err).into()
}

impl SessionStore for Database {
    fn append_session(&self, user: &UserId, record: &IntervalRecord) -> Result<(), SessionError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sessions (user_id, position, start, stop, duration)
             VALUES (?1,
                     (SELECT COALESCE(MAX(position) + 1, 0) FROM sessions WHERE user_id = ?1),
                     ?2, ?3, ?4)",
            params![user.as_str(), record.start, record.stop, record.duration],
        )
        .map_err(persistence)?;
        debug!(user = %user, start = %record.start, duration = %record.duration, "session appended");
        Ok(())
    }

    fn list_sessions(&self, user: &UserId) -> Result<Vec<IntervalRecord>, SessionError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT start, stop, duration FROM sessions
                 WHERE user_id = ?1 ORDER BY position, id",
            )
            .map_err(persistence)?;
        let rows = stmt
            .query_map(params![user.as_str()], |row| {
                Ok(IntervalRecord {
                    start: row.get(0)?,
                    stop: row.get(1)?,
                    duration: row.get(2)?,
                })
            })
            .map_err(persistence)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(persistence)
    }

    fn replace_sessions(&self, user: &UserId, records: &[IntervalRecord]) -> Result<(), SessionError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(persistence)?;
        tx.execute("DELETE FROM sessions WHERE user_id = ?1", params![user.as_str()])
            .map_err(persistence)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO sessions (user_id, position, start, stop, duration)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(persistence)?;
            for (position, record) in records.iter().enumerate() {
                stmt.execute(params![
                    user.as_str(),
                    position as i64,
                    record.start,
                    record.stop,
                    record.duration
                ])
                .map_err(persistence)?;
            }
        }
        tx.commit().map_err(persistence)?;
        debug!(user = %user, count = records.len(), "session log replaced");
        Ok(())
    }
}

impl UserDirectory for Database {
    fn get_user(&self, id: &UserId) -> Result<Option<User>, SessionError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id.as_str()],
            user_from_row,
        )
        .optional()
        .map_err(persistence)
    }

    fn list_users(&self) -> Result<Vec<User>, SessionError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY role DESC, username COLLATE NOCASE"
            ))
            .map_err(persistence)?;
        let rows = stmt.query_map([], user_from_row).map_err(persistence)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(persistence)
    }
}
