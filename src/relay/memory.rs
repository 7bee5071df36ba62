// SPDX-License-Identifier: MPL-2.0

use crate::protocol::{Note, RelayFilter};
use crate::relay::{EventSource, RelayError};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// An in-process relay: stores published notes and answers filters from
/// them. Can be switched offline to simulate unreachable relays.
#[derive(Default)]
pub struct MemorySource {
    notes: Mutex<Vec<Note>>,
    offline: AtomicBool,
    fetches: AtomicUsize,
}

impl MemorySource {
    pub fn new(notes: Vec<Note>) -> Self {
        Self {
            notes: Mutex::new(notes),
            ..Default::default()
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of fetches answered or refused so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn notes(&self) -> Vec<Note> {
        self.notes.lock().map(|n| n.clone()).unwrap_or_default()
    }

    fn check_online(&self) -> Result<(), RelayError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(RelayError::Unavailable("offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl EventSource for MemorySource {
    async fn fetch(&self, filter: &RelayFilter) -> Result<Vec<Note>, RelayError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;

        let notes = self
            .notes
            .lock()
            .map_err(|_| RelayError::Fetch("store poisoned".to_string()))?;
        let mut matching: Vec<Note> = notes.iter().filter(|n| filter.matches(n)).cloned().collect();

        // relays answer a limit with the newest matches
        if let Some(limit) = filter.limit {
            matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            matching.truncate(limit);
        }
        Ok(matching)
    }

    async fn publish(&self, note: &Note) -> Result<(), RelayError> {
        self.check_online()?;
        let mut notes = self
            .notes
            .lock()
            .map_err(|_| RelayError::Publish("store poisoned".to_string()))?;
        if !notes.iter().any(|n| n.id == note.id) {
            notes.push(note.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{KIND_REPOST, KIND_TEXT_NOTE};

    fn note(id: &str, kind: u16, created_at: u64) -> Note {
        Note {
            id: id.to_string(),
            pubkey: "author".to_string(),
            created_at,
            kind,
            tags: Vec::new(),
            content: String::new(),
            sig: String::new(),
            deleted: false,
            reposted_event: None,
            replied_event: None,
        }
    }

    #[tokio::test]
    async fn test_fetch_applies_filter_and_limit() {
        let source = MemorySource::new(vec![
            note("a", KIND_TEXT_NOTE, 10),
            note("b", KIND_REPOST, 20),
            note("c", KIND_TEXT_NOTE, 30),
            note("d", KIND_TEXT_NOTE, 40),
        ]);
        let filter = RelayFilter {
            kinds: Some(vec![KIND_TEXT_NOTE]),
            limit: Some(2),
            ..Default::default()
        };

        let ids: Vec<String> = source
            .fetch(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec!["d", "c"]);
    }

    #[tokio::test]
    async fn test_offline_refuses() {
        let source = MemorySource::default();
        source.set_offline(true);
        assert!(matches!(
            source.fetch(&RelayFilter::default()).await,
            Err(RelayError::Unavailable(_))
        ));
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_publish_is_idempotent() {
        let source = MemorySource::default();
        let n = note("a", KIND_TEXT_NOTE, 1);
        source.publish(&n).await.unwrap();
        source.publish(&n).await.unwrap();
        assert_eq!(source.notes().len(), 1);
    }
}
