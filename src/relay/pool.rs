// SPDX-License-Identifier: MPL-2.0

use crate::config::RELAY_FETCH_TIMEOUT_SECS;
use crate::feed::RequestQueue;
use crate::protocol::events::{note_from_event, note_to_event};
use crate::protocol::{Note, RelayFilter};
use crate::relay::{EventSource, RelayError};
use nostr_sdk::prelude::{Client, Keys};
use std::sync::Arc;
use std::time::Duration;

/// Relay connections backed by `nostr_sdk::Client`. Every fetch and publish
/// goes through the shared [`RequestQueue`].
pub struct RelayPool {
    client: Client,
    queue: Arc<RequestQueue>,
    timeout: Duration,
}

impl RelayPool {
    /// Add `relays` and start connecting. Relays that cannot be added are
    /// logged and skipped; it is an error only if none could be.
    pub async fn connect(
        keys: Option<Keys>,
        relays: &[String],
        queue: Arc<RequestQueue>,
    ) -> Result<Self, RelayError> {
        let client = match keys {
            Some(keys) => Client::builder().signer(keys).build(),
            None => Client::default(),
        };

        let mut added = 0usize;
        for url in relays {
            match client.add_relay(url.as_str()).await {
                Ok(_) => {
                    tracing::debug!("added relay {}", url);
                    added += 1;
                }
                Err(e) => tracing::warn!("failed to add relay {}: {}", url, e),
            }
        }
        if added == 0 {
            return Err(RelayError::Unavailable("no usable relays".to_string()));
        }

        client.connect().await;
        tracing::info!("connecting to {} relays", added);

        Ok(Self {
            client,
            queue,
            timeout: Duration::from_secs(RELAY_FETCH_TIMEOUT_SECS),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn disconnect(&self) {
        self.client.disconnect().await;
    }
}

impl EventSource for RelayPool {
    async fn fetch(&self, filter: &RelayFilter) -> Result<Vec<Note>, RelayError> {
        let nostr_filter = filter.to_nostr()?;
        let client = self.client.clone();
        let timeout = self.timeout;

        let events = self
            .queue
            .run(move || async move { client.fetch_events(nostr_filter, timeout).await })
            .await
            .map_err(|e| RelayError::Fetch(e.to_string()))?;

        let mut notes = Vec::new();
        for event in events.into_iter() {
            match note_from_event(&event) {
                Ok(note) => notes.push(note),
                Err(e) => tracing::warn!("dropping unreadable event {}: {}", event.id, e),
            }
        }
        tracing::debug!("fetched {} notes", notes.len());
        Ok(notes)
    }

    async fn publish(&self, note: &Note) -> Result<(), RelayError> {
        let event = note_to_event(note)?;
        let client = self.client.clone();

        self.queue
            .run(move || async move { client.send_event(&event).await.map(|_| ()) })
            .await
            .map_err(|e| RelayError::Publish(e.to_string()))?;

        tracing::info!("published {} (kind {})", note.id, note.kind);
        Ok(())
    }
}
