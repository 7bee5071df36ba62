// SPDX-License-Identifier: MPL-2.0

use crate::cache::{CacheDb, CacheError, is_fresh};
use crate::config::METADATA_TTL_SECS;
use crate::protocol::Metadata;
use rusqlite::{OptionalExtension, params};
use std::collections::HashMap;

/// Cache operations for profile metadata
pub struct MetadataCache<'a> {
    db: &'a CacheDb,
}

impl<'a> MetadataCache<'a> {
    pub fn new(db: &'a CacheDb) -> Self {
        Self { db }
    }

    pub fn get(&self, pubkey: &str) -> Result<Option<Metadata>, CacheError> {
        self.get_at(pubkey, CacheDb::now())
    }

    /// Fresh metadata for `pubkey`, or `None` when missing, expired or
    /// unreadable.
    pub fn get_at(&self, pubkey: &str, now: i64) -> Result<Option<Metadata>, CacheError> {
        let conn = self.db.conn();
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT content, timestamp FROM metadata WHERE pubkey = ?",
                [pubkey],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((content, timestamp)) = row else {
            tracing::debug!("metadata cache miss for {}", pubkey);
            return Ok(None);
        };
        if !is_fresh(timestamp, now, METADATA_TTL_SECS) {
            tracing::debug!("metadata cache expired for {}", pubkey);
            return Ok(None);
        }

        match serde_json::from_str(&content) {
            Ok(meta) => Ok(Some(meta)),
            Err(e) => {
                tracing::warn!("corrupt metadata cache row for {}: {}", pubkey, e);
                Ok(None)
            }
        }
    }

    /// Fresh entries for whichever of `pubkeys` are cached.
    pub fn get_many(&self, pubkeys: &[String]) -> Result<HashMap<String, Metadata>, CacheError> {
        self.get_many_at(pubkeys, CacheDb::now())
    }

    pub fn get_many_at(
        &self,
        pubkeys: &[String],
        now: i64,
    ) -> Result<HashMap<String, Metadata>, CacheError> {
        let mut found = HashMap::new();
        for pubkey in pubkeys {
            if let Some(meta) = self.get_at(pubkey, now)? {
                found.insert(pubkey.clone(), meta);
            }
        }
        Ok(found)
    }

    pub fn store(&self, pubkey: &str, meta: &Metadata) -> Result<(), CacheError> {
        self.store_at(pubkey, meta, CacheDb::now())
    }

    pub fn store_at(&self, pubkey: &str, meta: &Metadata, now: i64) -> Result<(), CacheError> {
        let content = serde_json::to_string(meta)?;
        let conn = self.db.conn();
        conn.execute(
            r#"
            INSERT INTO metadata (pubkey, content, timestamp)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(pubkey) DO UPDATE SET
                content = excluded.content,
                timestamp = excluded.timestamp
            "#,
            params![pubkey, content, now],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Metadata {
        Metadata {
            name: Some("alice".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_ttl_boundary() {
        let db = CacheDb::open_in_memory().unwrap();
        let cache = MetadataCache::new(&db);
        let t = 1_700_000_000;

        cache.store_at("pk", &alice(), t).unwrap();
        assert_eq!(cache.get_at("pk", t).unwrap(), Some(alice()));
        assert_eq!(
            cache.get_at("pk", t + METADATA_TTL_SECS - 1).unwrap(),
            Some(alice())
        );
        assert_eq!(cache.get_at("pk", t + METADATA_TTL_SECS).unwrap(), None);
        assert_eq!(cache.get_at("pk", t + METADATA_TTL_SECS + 1).unwrap(), None);
    }

    #[test]
    fn test_store_replaces_and_refreshes() {
        let db = CacheDb::open_in_memory().unwrap();
        let cache = MetadataCache::new(&db);

        cache.store_at("pk", &alice(), 0).unwrap();
        let bob = Metadata {
            name: Some("bob".to_string()),
            ..Default::default()
        };
        cache.store_at("pk", &bob, METADATA_TTL_SECS).unwrap();

        assert_eq!(cache.get_at("pk", METADATA_TTL_SECS + 10).unwrap(), Some(bob));
    }

    #[test]
    fn test_get_many_skips_missing_and_stale() {
        let db = CacheDb::open_in_memory().unwrap();
        let cache = MetadataCache::new(&db);
        cache.store_at("fresh", &alice(), 100).unwrap();
        cache.store_at("stale", &alice(), 100 - METADATA_TTL_SECS).unwrap();

        let keys = vec!["fresh".to_string(), "stale".to_string(), "none".to_string()];
        let found = cache.get_many_at(&keys, 100).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key("fresh"));
    }

    #[test]
    fn test_corrupt_row_is_a_miss() {
        let db = CacheDb::open_in_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO metadata (pubkey, content, timestamp) VALUES ('pk', '{not json', 5)",
                [],
            )
            .unwrap();

        assert_eq!(MetadataCache::new(&db).get_at("pk", 6).unwrap(), None);
    }
}
