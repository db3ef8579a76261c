use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::traits::{SessionStore, UserDirectory};
use crate::error::SessionError;
use crate::session::IntervalRecord;
use crate::user::{User, UserId};

/// In-process store for tests and embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<UserId, User>>,
    sessions: Mutex<HashMap<UserId, Vec<IntervalRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let store = Self::new();
        for user in users {
            store.add_user(user);
        }
        store
    }

    /// Insert or replace a user.
    pub fn add_user(&self, user: User) {
        lock(&self.users).insert(user.id.clone(), user);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl SessionStore for MemoryStore {
    fn append_session(&self, user: &UserId, record: &IntervalRecord) -> Result<(), SessionError> {
        lock(&self.sessions)
            .entry(user.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    fn list_sessions(&self, user: &UserId) -> Result<Vec<IntervalRecord>, SessionError> {
        Ok(lock(&self.sessions).get(user).cloned().unwrap_or_default())
    }

    fn replace_sessions(&self, user: &UserId, records: &[IntervalRecord]) -> Result<(), SessionError> {
        lock(&self.sessions).insert(user.clone(), records.to_vec());
        Ok(())
    }
}

impl UserDirectory for MemoryStore {
    fn get_user(&self, id: &UserId) -> Result<Option<User>, SessionError> {
        Ok(lock(&self.users).get(id).cloned())
    }

    fn list_users(&self) -> Result<Vec<User>, SessionError> {
        let mut users: Vec<User> = lock(&self.users).values().cloned().collect();
        users.sort_by(|a, b| a.username.to_lowercase().cmp(&b.username.to_lowercase()));
        Ok(users)
    }
}
