// SPDX-License-Identifier: MPL-2.0

use crate::cache::{CacheDb, CacheError};
use rusqlite::{OptionalExtension, params};

/// When each conversation was last opened. Entries never expire.
pub struct LastViewedStore<'a> {
    db: &'a CacheDb,
}

impl<'a> LastViewedStore<'a> {
    pub fn new(db: &'a CacheDb) -> Self {
        Self { db }
    }

    pub fn get(&self, user: &str, peer: &str) -> Result<Option<u64>, CacheError> {
        let conn = self.db.conn();
        let viewed_at: Option<i64> = conn
            .query_row(
                "SELECT viewed_at FROM last_viewed WHERE user_pubkey = ?1 AND peer_pubkey = ?2",
                params![user, peer],
                |row| row.get(0),
            )
            .optional()?;
        Ok(viewed_at.map(|t| t.max(0) as u64))
    }

    pub fn set(&self, user: &str, peer: &str, viewed_at: u64) -> Result<(), CacheError> {
        let conn = self.db.conn();
        conn.execute(
            r#"
            INSERT INTO last_viewed (user_pubkey, peer_pubkey, viewed_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_pubkey, peer_pubkey) DO UPDATE SET
                viewed_at = excluded.viewed_at
            "#,
            params![user, peer, viewed_at as i64],
        )?;
        Ok(())
    }
}
