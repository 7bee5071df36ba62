// SPDX-License-Identifier: MPL-2.0

use crate::cache::{CacheDb, CacheError, is_fresh};
use crate::config::COUNTS_TTL_SECS;
use crate::protocol::Counts;
use rusqlite::{OptionalExtension, params};

/// Cache operations for engagement counts
pub struct CountsCache<'a> {
    db: &'a CacheDb,
}

impl<'a> CountsCache<'a> {
    pub fn new(db: &'a CacheDb) -> Self {
        Self { db }
    }

    pub fn get(&self, note_id: &str) -> Result<Option<Counts>, CacheError> {
        self.get_at(note_id, CacheDb::now())
    }

    pub fn get_at(&self, note_id: &str, now: i64) -> Result<Option<Counts>, CacheError> {
        let conn = self.db.conn();
        let row = conn
            .query_row(
                "SELECT reactions, reposts, replies, timestamp FROM counts WHERE note_id = ?",
                [note_id],
                |row| {
                    Ok((
                        Counts {
                            reactions: row.get(0)?,
                            reposts: row.get(1)?,
                            replies: row.get(2)?,
                        },
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        Ok(row
            .filter(|(_, timestamp)| is_fresh(*timestamp, now, COUNTS_TTL_SECS))
            .map(|(counts, _)| counts))
    }

    pub fn store(&self, note_id: &str, counts: &Counts) -> Result<(), CacheError> {
        self.store_at(note_id, counts, CacheDb::now())
    }

    pub fn store_at(&self, note_id: &str, counts: &Counts, now: i64) -> Result<(), CacheError> {
        let conn = self.db.conn();
        conn.execute(
            r#"
            INSERT INTO counts (note_id, reactions, reposts, replies, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(note_id) DO UPDATE SET
                reactions = excluded.reactions,
                reposts = excluded.reposts,
                replies = excluded.replies,
                timestamp = excluded.timestamp
            "#,
            params![note_id, counts.reactions, counts.reposts, counts.replies, now],
        )?;
        Ok(())
    }
}
