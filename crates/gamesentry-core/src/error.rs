//! Core error types for gamesentry-core.
//!
//! This module defines the error hierarchy using thiserror. Gate refusals and
//! session state errors are explicit values the caller is expected to show to
//! the user; storage and configuration errors wrap their underlying causes.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for gamesentry-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session state machine and gate errors
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Connection mutex was poisoned by a panicking writer
    #[error("Database connection is poisoned")]
    Poisoned,

    /// Data directory could not be prepared
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid time range
    #[error("Invalid time range: start ({start}) cannot be after stop ({stop})")]
    InvalidTimeRange { start: String, stop: String },

    /// Unparsable timestamp, time-of-day or duration
    #[error("Invalid value for '{field}': {value}")]
    InvalidValue { field: String, value: String },

    /// Out of bounds
    #[error("Index {index} out of bounds for {collection} (length: {len})")]
    OutOfBounds {
        collection: String,
        index: usize,
        len: usize,
    },

    /// Empty or duplicate username
    #[error("Invalid username '{0}'")]
    InvalidUsername(String),
}

/// Reasons a session start is refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateDenial {
    /// The lunch/teeth routine has not been completed.
    #[error("Please brush your teeth before playing.")]
    RoutineRequired,

    /// Current time-of-day is outside the allowed play window.
    #[error("You can only play between {start} and {end}.")]
    OutsideAllowedHours { start: String, end: String },

    /// Allowed-hours bounds do not parse; the gate fails closed.
    #[error("Allowed play hours are not set correctly ({field} = '{value}').")]
    InvalidConfiguration { field: String, value: String },

    /// A rest period is still running.
    #[error("Break time: {remaining_secs} seconds left before play is allowed again.")]
    Resting { remaining_secs: i64 },
}

/// Errors raised by the session state machine and its collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Start refused by the gate.
    #[error("Start refused: {0}")]
    Denied(#[from] GateDenial),

    /// A new or edited interval overlaps an existing one.
    #[error("The time range overlaps with another session (from {start} to {stop})")]
    OverlapRejected { start: String, stop: String },

    /// `start` called while a session is already live.
    #[error("A session is already running for user {0}")]
    AlreadyRunning(String),

    /// `stop` called without a live session.
    #[error("No session is running for user {0}")]
    NotRunning(String),

    /// Persistence collaborator failed.
    #[error("Session storage unavailable: {0}")]
    PersistenceUnavailable(String),

    /// User id is empty or contains forbidden characters.
    #[error("Malformed user id '{0}'")]
    InvalidUserId(String),

    /// User id does not resolve to a configured user.
    #[error("Unknown user {0}")]
    UnknownUser(String),

    /// Budget rules only apply to kid accounts.
    #[error("User {0} is not a kid account")]
    NotAKid(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg) => {
                if code.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<DatabaseError> for SessionError {
    fn from(err: DatabaseError) -> Self {
        SessionError::PersistenceUnavailable(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
