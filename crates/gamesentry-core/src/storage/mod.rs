mod config;
pub mod database;
mod memory;
pub mod migrations;
mod traits;

pub use config::{Config, LimitsConfig, NotificationsConfig};
pub use database::Database;
pub use memory::MemoryStore;
pub use traits::{SessionStore, UserDirectory};

use std::path::PathBuf;

use crate::error::DatabaseError;

/// Returns `~/.config/gamesentry[-dev]/` based on GAMESENTRY_ENV.
///
/// Set GAMESENTRY_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, DatabaseError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("GAMESENTRY_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("gamesentry-dev")
    } else {
        base_dir.join("gamesentry")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| DatabaseError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
