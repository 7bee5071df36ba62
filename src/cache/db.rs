// SPDX-License-Identifier: MPL-2.0

use crate::cache::CacheError;
use crate::cache::schema::SCHEMA;
use crate::config::{APP_DATA_DIR, COUNTS_TTL_SECS, METADATA_TTL_SECS, NOTES_TTL_SECS};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Handle to the cache database for a specific user
#[derive(Clone)]
pub struct CacheDb {
    conn: Arc<Mutex<Connection>>,
}

impl CacheDb {
    /// Open or create the cache database for a user.
    /// Path: ~/.local/share/nostrfeed/{user}/cache.db
    pub fn open(user: &str) -> Result<Self, CacheError> {
        let path = Self::cache_path(user)?;
        Self::open_at(&path)
    }

    /// Open or create a cache database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CacheError::Path(format!("failed to create cache dir: {}", e)))?;
        }

        let conn = Connection::open(path)?;
        Self::migrate(&conn)?;
        tracing::debug!("opened cache at {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn migrate(conn: &Connection) -> Result<(), CacheError> {
        // all CREATE IF NOT EXISTS
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn cache_path(user: &str) -> Result<PathBuf, CacheError> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| CacheError::Path("could not find data directory".to_string()))?;

        // keep the user key a single path component
        let safe_user: String = user
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        if safe_user.is_empty() {
            return Err(CacheError::Path("empty user key".to_string()));
        }

        Ok(data_dir.join(APP_DATA_DIR).join(safe_user).join("cache.db"))
    }

    /// Access connection for operations
    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("cache lock poisoned")
    }

    /// Get current unix timestamp
    pub fn now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    /// Delete expired rows from every TTL namespace. `last_viewed` is kept.
    /// Returns the number of rows removed.
    pub fn cleanup_stale(&self) -> Result<usize, CacheError> {
        self.cleanup_stale_at(Self::now())
    }

    pub fn cleanup_stale_at(&self, now: i64) -> Result<usize, CacheError> {
        let conn = self.conn();
        let mut removed = 0;

        removed += conn.execute(
            "DELETE FROM metadata WHERE timestamp <= ?",
            [now - METADATA_TTL_SECS],
        )?;
        removed += conn.execute(
            "DELETE FROM counts WHERE timestamp <= ?",
            [now - COUNTS_TTL_SECS],
        )?;
        removed += conn.execute(
            "DELETE FROM cached_notes WHERE timestamp <= ?",
            [now - NOTES_TTL_SECS],
        )?;

        tracing::info!("cache cleanup removed {} stale rows", removed);
        Ok(removed)
    }
}
