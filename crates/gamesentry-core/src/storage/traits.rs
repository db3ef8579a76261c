//! Collaborator contracts the session controller depends on.

use crate::error::SessionError;
use crate::session::IntervalRecord;
use crate::user::{User, UserId};

/// Per-user session log persistence.
///
/// `list_sessions` returns entries in insertion order; that order is what
/// edit/delete indexes refer to.
pub trait SessionStore: Send + Sync {
    fn append_session(&self, user: &UserId, record: &IntervalRecord) -> Result<(), SessionError>;

    fn list_sessions(&self, user: &UserId) -> Result<Vec<IntervalRecord>, SessionError>;

    /// Replace the whole log for `user` (edit, delete, clear).
    fn replace_sessions(&self, user: &UserId, records: &[IntervalRecord]) -> Result<(), SessionError>;
}

/// Read access to configured users.
pub trait UserDirectory: Send + Sync {
    fn get_user(&self, id: &UserId) -> Result<Option<User>, SessionError>;

    fn list_users(&self) -> Result<Vec<User>, SessionError>;
}
