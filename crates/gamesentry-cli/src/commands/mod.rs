pub mod config;
pub mod session;
pub mod user;

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use gamesentry_core::{Config, Database, EngineSnapshot, User, UserDirectory, UserId};

const ENGINE_KEY: &str = "engine_state";

/// Open the database from `--db`, then the config override, then the default.
pub fn open_database(db: Option<&Path>) -> Result<Arc<Database>, Box<dyn Error>> {
    let database = match db {
        Some(path) => Database::open_at(path)?,
        None => match Config::load_or_default().database {
            Some(path) => Database::open_at(&path)?,
            None => Database::open()?,
        },
    };
    Ok(Arc::new(database))
}

/// Look a user up by username (case-insensitive) or id.
pub fn resolve_user(db: &Database, name_or_id: &str) -> Result<User, Box<dyn Error>> {
    if let Some(user) = db.find_user_by_name(name_or_id)? {
        return Ok(user);
    }
    if let Ok(id) = UserId::parse(name_or_id) {
        if let Some(user) = db.get_user(&id)? {
            return Ok(user);
        }
    }
    Err(format!("no such user: {name_or_id}").into())
}

pub fn load_snapshot(db: &Database) -> EngineSnapshot {
    match db.kv_get(ENGINE_KEY) {
        Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "discarding unreadable engine state");
            EngineSnapshot::default()
        }),
        Ok(None) => EngineSnapshot::default(),
        Err(e) => {
            tracing::warn!(error = %e, "could not read engine state");
            EngineSnapshot::default()
        }
    }
}

pub fn save_snapshot(db: &Database, snapshot: &EngineSnapshot) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string(snapshot)?;
    db.kv_set(ENGINE_KEY, &json)?;
    Ok(())
}
