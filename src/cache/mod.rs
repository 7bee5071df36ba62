// SPDX-License-Identifier: MPL-2.0

//! Per-user SQLite cache with time-to-live reads.
//!
//! Each namespace is its own table with one row per key, and every row
//! carries the Unix time it was written. Reads treat a row as fresh while
//! `now - timestamp < ttl`; stale rows stay on disk until overwritten or
//! removed by [`CacheDb::cleanup_stale`].

mod counts;
mod db;
mod last_viewed;
mod metadata;
mod notes;
mod schema;

pub use counts::CountsCache;
pub use db::CacheDb;
pub use last_viewed::LastViewedStore;
pub use metadata::MetadataCache;
pub use notes::NotesCache;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("database path error: {0}")]
    Path(String),
}

/// Whether a row written at `timestamp` is still fresh at `now`.
pub(crate) fn is_fresh(timestamp: i64, now: i64, ttl: i64) -> bool {
    now - timestamp < ttl
}
