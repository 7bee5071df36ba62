// SPDX-License-Identifier: MPL-2.0

use crate::cache::{CacheDb, CacheError, is_fresh};
use crate::config::NOTES_TTL_SECS;
use crate::protocol::Note;
use rusqlite::{OptionalExtension, params};

/// Last loaded feed page per algorithm, shown while relays catch up.
pub struct NotesCache<'a> {
    db: &'a CacheDb,
}

impl<'a> NotesCache<'a> {
    pub fn new(db: &'a CacheDb) -> Self {
        Self { db }
    }

    pub fn get(&self, algo_id: &str) -> Result<Option<Vec<Note>>, CacheError> {
        self.get_at(algo_id, CacheDb::now())
    }

    pub fn get_at(&self, algo_id: &str, now: i64) -> Result<Option<Vec<Note>>, CacheError> {
        let conn = self.db.conn();
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT notes_json, timestamp FROM cached_notes WHERE algo_id = ?",
                [algo_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((json, timestamp)) = row else {
            return Ok(None);
        };
        if !is_fresh(timestamp, now, NOTES_TTL_SECS) {
            tracing::debug!("cached notes for {} expired", algo_id);
            return Ok(None);
        }

        match serde_json::from_str::<Vec<Note>>(&json) {
            Ok(notes) => {
                tracing::debug!("loaded {} cached notes for {}", notes.len(), algo_id);
                Ok(Some(notes))
            }
            Err(e) => {
                tracing::warn!("corrupt cached notes for {}: {}", algo_id, e);
                Ok(None)
            }
        }
    }

    pub fn store(&self, algo_id: &str, notes: &[Note]) -> Result<(), CacheError> {
        self.store_at(algo_id, notes, CacheDb::now())
    }

    pub fn store_at(&self, algo_id: &str, notes: &[Note], now: i64) -> Result<(), CacheError> {
        let json = serde_json::to_string(notes)?;
        let conn = self.db.conn();
        conn.execute(
            r#"
            INSERT INTO cached_notes (algo_id, notes_json, timestamp)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(algo_id) DO UPDATE SET
                notes_json = excluded.notes_json,
                timestamp = excluded.timestamp
            "#,
            params![algo_id, json, now],
        )?;
        Ok(())
    }
}
