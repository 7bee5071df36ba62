// SPDX-License-Identifier: MPL-2.0

//! Client operations: feeds, profiles, engagement, publishing and DMs.
//!
//! [`App`] owns the cache and an [`EventSource`]. Reads go cache first and
//! fall back to relays; writes are built from templates, signed with the
//! logged-in keys and published.

use crate::api::ApiError;
use crate::cache::{
    CacheDb, CacheError, CountsCache, LastViewedStore, MetadataCache, NotesCache,
};
use crate::config::FEED_PAGE_SIZE;
use crate::feed::{aggregate_counts, insert_event_in_place, ordered};
use crate::protocol::crypto::{self, DmScheme};
use crate::protocol::events::{self, EventTemplate};
use crate::protocol::filters::{self, algorithm_accepts, construct_filter_from_byo_algo};
use crate::protocol::{
    Algorithm, Counts, CryptoError, EventError, KIND_FOLLOW_LIST, KIND_METADATA, KeyError,
    Metadata, Note, RelayFilter,
};
use crate::relay::{EventSource, RelayError};
use crate::state::{SessionError, SettingsError};
use nostr_sdk::prelude::Keys;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("not logged in")]
    NotLoggedIn,
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error(transparent)]
    Event(#[from] EventError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// One decrypted direct message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectMessage {
    pub id: String,
    pub from_me: bool,
    pub created_at: u64,
    pub text: String,
}

pub struct App<S: EventSource> {
    source: S,
    cache: CacheDb,
    keys: Option<Keys>,
}

impl<S: EventSource> App<S> {
    pub fn new(source: S, cache: CacheDb, keys: Option<Keys>) -> Self {
        Self {
            source,
            cache,
            keys,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> &CacheDb {
        &self.cache
    }

    fn keys(&self) -> Result<&Keys, AppError> {
        self.keys.as_ref().ok_or(AppError::NotLoggedIn)
    }

    /// Hex pubkey of the logged-in user.
    pub fn pubkey(&self) -> Option<String> {
        self.keys.as_ref().map(|k| k.public_key().to_hex())
    }

    /// Feed for `algo` over `follows`, newest first.
    ///
    /// Starts from the cached page when it is fresh, keeping only cached notes
    /// the current filter still matches, merges what the relays return and
    /// writes back the newest [`FEED_PAGE_SIZE`] notes. If the relays fail and
    /// there is a cached page, the cached page is returned.
    pub async fn load_feed(
        &self,
        algo: &Algorithm,
        follows: &[String],
        since: Option<u64>,
    ) -> Result<Vec<Note>, AppError> {
        let filter = construct_filter_from_byo_algo(algo, follows, since);
        if filter.authors.as_ref().is_none_or(|a| a.is_empty()) {
            tracing::info!("no follows for {}, feed is empty", algo.id);
            return Ok(Vec::new());
        }

        // The cached page may predate an unfollow or a narrower `since`.
        let cache = NotesCache::new(&self.cache);
        let mut feed: Vec<Note> = cache
            .get(&algo.id)?
            .unwrap_or_default()
            .into_iter()
            .filter(|n| filter.matches(n) && algorithm_accepts(algo, n))
            .collect();
        let had_cached = !feed.is_empty();

        let fetched = match self.source.fetch(&filter).await {
            Ok(notes) => notes,
            Err(e) if had_cached => {
                tracing::warn!("relay fetch failed, showing cached feed: {}", e);
                return Ok(feed);
            }
            Err(e) => return Err(e.into()),
        };

        // Relays hold more below a full page. Cached notes under it would
        // leave a gap that paging never fills.
        let full_page = filter.limit.is_some_and(|limit| fetched.len() >= limit);
        if let Some(floor) = fetched.iter().map(|n| n.created_at).min().filter(|_| full_page) {
            feed.retain(|n| n.created_at >= floor);
        }

        let mut added = 0;
        for note in fetched {
            if algorithm_accepts(algo, &note) && insert_event_in_place(&mut feed, note) {
                added += 1;
            }
        }
        feed.truncate(FEED_PAGE_SIZE);
        tracing::debug!("feed {}: {} new notes, {} total", algo.id, added, feed.len());

        self.mark_deleted(&mut feed).await;
        self.attach_reply_parents(&mut feed).await;
        cache.store(&algo.id, &feed)?;
        Ok(feed)
    }

    /// Next page below the oldest note in `current`. Returns the combined list.
    pub async fn load_older(
        &self,
        algo: &Algorithm,
        follows: &[String],
        current: &[Note],
    ) -> Result<Vec<Note>, AppError> {
        let Some(oldest) = ordered::oldest_timestamp(current) else {
            return self.load_feed(algo, follows, None).await;
        };

        let mut filter = construct_filter_from_byo_algo(algo, follows, None);
        // Inclusive: notes sharing the boundary second may not all be in
        // `current`. Repeats are dropped by the merge.
        filter.until = Some(oldest);

        let page: Vec<Note> = self
            .source
            .fetch(&filter)
            .await?
            .into_iter()
            .filter(|n| algorithm_accepts(algo, n))
            .collect();

        let mut older = Vec::with_capacity(page.len());
        for note in page {
            insert_event_in_place(&mut older, note);
        }
        self.mark_deleted(&mut older).await;
        self.attach_reply_parents(&mut older).await;

        Ok(ordered::merge_descending(current, &older))
    }

    async fn mark_deleted(&self, feed: &mut [Note]) {
        if feed.is_empty() {
            return;
        }
        let ids: Vec<String> = feed.iter().map(|n| n.id.clone()).collect();
        match self.source.fetch(&filters::deletions(&ids)).await {
            Ok(deletions) => {
                let marked = ordered::apply_deletions(feed, &deletions);
                if marked > 0 {
                    tracing::debug!("marked {} deleted notes", marked);
                }
            }
            Err(e) => tracing::warn!("could not fetch deletions: {}", e),
        }
    }

    async fn attach_reply_parents(&self, feed: &mut [Note]) {
        let wanted: HashSet<String> = feed
            .iter()
            .filter(|n| n.replied_event.is_none())
            .filter_map(|n| n.reply_parent_id().map(str::to_string))
            .collect();
        if wanted.is_empty() {
            return;
        }

        let filter = RelayFilter {
            ids: Some(wanted.into_iter().collect()),
            ..Default::default()
        };
        let parents: HashMap<String, Note> = match self.source.fetch(&filter).await {
            Ok(notes) => notes.into_iter().map(|n| (n.id.clone(), n)).collect(),
            Err(e) => {
                tracing::warn!("could not fetch reply parents: {}", e);
                return;
            }
        };

        for note in feed.iter_mut() {
            if let Some(parent) = note.reply_parent_id().and_then(|id| parents.get(id)) {
                note.replied_event = Some(Box::new(parent.clone()));
            }
        }
    }

    /// Profile metadata, cache first.
    pub async fn profile(&self, pubkey: &str) -> Result<Option<Metadata>, AppError> {
        let mut found = self.profiles(&[pubkey.to_string()]).await?;
        Ok(found.remove(pubkey))
    }

    /// Metadata for several pubkeys; cache hits are not re-fetched.
    pub async fn profiles(&self, pubkeys: &[String]) -> Result<HashMap<String, Metadata>, AppError> {
        let cache = MetadataCache::new(&self.cache);
        let mut found = cache.get_many(pubkeys)?;

        let missing: Vec<String> = pubkeys
            .iter()
            .filter(|pk| !found.contains_key(*pk))
            .cloned()
            .collect();
        if missing.is_empty() {
            return Ok(found);
        }

        let events = self.source.fetch(&filters::metadata(&missing)).await?;
        let mut newest: HashMap<&str, &Note> = HashMap::new();
        for event in events.iter().filter(|e| e.kind == KIND_METADATA) {
            let entry = newest.entry(event.pubkey.as_str()).or_insert(event);
            if event.created_at > entry.created_at {
                *entry = event;
            }
        }

        for (pubkey, event) in newest {
            let meta = Metadata::from_content(&event.content);
            cache.store(pubkey, &meta)?;
            found.insert(pubkey.to_string(), meta);
        }
        Ok(found)
    }

    /// Engagement counts; fresh cached counts are used as is.
    pub async fn counts(&self, note_ids: &[String]) -> Result<HashMap<String, Counts>, AppError> {
        let cache = CountsCache::new(&self.cache);
        let mut result = HashMap::new();
        let mut missing = Vec::new();

        for id in note_ids {
            match cache.get(id)? {
                Some(counts) => {
                    result.insert(id.clone(), counts);
                }
                None => missing.push(id.clone()),
            }
        }
        if missing.is_empty() {
            return Ok(result);
        }

        let events = self.source.fetch(&filters::engagement(&missing)).await?;
        for (id, counts) in aggregate_counts(&missing, &events) {
            cache.store(&id, &counts)?;
            result.insert(id, counts);
        }
        Ok(result)
    }

    /// Latest kind-3 follow list for `pubkey`.
    pub async fn follows(&self, pubkey: &str) -> Result<Vec<String>, AppError> {
        Ok(self
            .latest_follow_list(pubkey)
            .await?
            .map(|n| events::follows_from_note(&n))
            .unwrap_or_default())
    }

    /// A user's own notes and reposts, newest first.
    pub async fn profile_feed(&self, pubkey: &str, until: Option<u64>) -> Result<Vec<Note>, AppError> {
        let notes = self.source.fetch(&filters::profile_notes(pubkey, until)).await?;
        self.ordered_page(notes).await
    }

    /// Notes tagged with `tag`, newest first.
    pub async fn hashtag_feed(&self, tag: &str, until: Option<u64>) -> Result<Vec<Note>, AppError> {
        let notes = self.source.fetch(&filters::hashtag(tag, until)).await?;
        self.ordered_page(notes).await
    }

    /// Direct replies to a note, newest first.
    pub async fn replies(&self, note_id: &str) -> Result<Vec<Note>, AppError> {
        let notes: Vec<Note> = self
            .source
            .fetch(&filters::replies_to(note_id))
            .await?
            .into_iter()
            .filter(|n| n.reply_parent_id() == Some(note_id))
            .collect();
        self.ordered_page(notes).await
    }

    pub async fn note(&self, id: &str) -> Result<Option<Note>, AppError> {
        let notes = self.source.fetch(&filters::note_by_id(id)).await?;
        Ok(notes.into_iter().find(|n| n.id == id))
    }

    /// Pubkeys that have sent the user DMs since `since`, most recent first.
    pub async fn inbox_peers(&self, since: Option<u64>) -> Result<Vec<String>, AppError> {
        let me = self.pubkey().ok_or(AppError::NotLoggedIn)?;
        let mut messages = self.source.fetch(&filters::inbox(&me, since)).await?;
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut seen = HashSet::new();
        Ok(messages
            .into_iter()
            .filter(|n| n.pubkey != me && seen.insert(n.pubkey.clone()))
            .map(|n| n.pubkey)
            .collect())
    }

    async fn ordered_page(&self, notes: Vec<Note>) -> Result<Vec<Note>, AppError> {
        let mut page = Vec::with_capacity(notes.len());
        for note in notes {
            insert_event_in_place(&mut page, note);
        }
        self.mark_deleted(&mut page).await;
        Ok(page)
    }

    async fn latest_follow_list(&self, pubkey: &str) -> Result<Option<Note>, AppError> {
        let lists = self.source.fetch(&filters::follow_list(pubkey)).await?;
        Ok(lists
            .into_iter()
            .filter(|n| n.kind == KIND_FOLLOW_LIST && n.pubkey == pubkey)
            .max_by_key(|n| n.created_at))
    }

    async fn sign_and_publish(&self, template: &EventTemplate) -> Result<Note, AppError> {
        let note = events::sign(template, self.keys()?)?;
        self.source.publish(&note).await?;
        Ok(note)
    }

    pub async fn post(&self, text: &str) -> Result<Note, AppError> {
        self.sign_and_publish(&events::text_note(text)).await
    }

    pub async fn reply(&self, parent: &Note, text: &str) -> Result<Note, AppError> {
        self.sign_and_publish(&events::reply(parent, text)).await
    }

    pub async fn repost(&self, note: &Note) -> Result<Note, AppError> {
        self.sign_and_publish(&events::repost(note)?).await
    }

    pub async fn react(&self, note: &Note, content: &str) -> Result<Note, AppError> {
        self.sign_and_publish(&events::reaction(note, content)).await
    }

    pub async fn delete(&self, ids: &[String], reason: Option<&str>) -> Result<Note, AppError> {
        self.sign_and_publish(&events::deletion(ids, reason)).await
    }

    pub async fn follow(&self, pubkey: &str) -> Result<Note, AppError> {
        let me = self.pubkey().ok_or(AppError::NotLoggedIn)?;
        let target = crate::protocol::keys::pubkey_hex(pubkey)?;
        let current = self.latest_follow_list(&me).await?;
        let follows = current.as_ref().map(events::follows_from_note).unwrap_or_default();
        self.publish_follow_list(events::follow(&follows, &target), current.as_ref())
            .await
    }

    pub async fn unfollow(&self, pubkey: &str) -> Result<Note, AppError> {
        let me = self.pubkey().ok_or(AppError::NotLoggedIn)?;
        let target = crate::protocol::keys::pubkey_hex(pubkey)?;
        let current = self.latest_follow_list(&me).await?;
        let follows = current.as_ref().map(events::follows_from_note).unwrap_or_default();
        self.publish_follow_list(events::unfollow(&follows, &target), current.as_ref())
            .await
    }

    /// A replacement follow list must be strictly newer than the one it
    /// replaces, or relays may keep the old one.
    async fn publish_follow_list(
        &self,
        template: EventTemplate,
        previous: Option<&Note>,
    ) -> Result<Note, AppError> {
        let created_at = match previous {
            Some(prev) if prev.created_at >= template.created_at => prev.created_at + 1,
            _ => template.created_at,
        };
        self.sign_and_publish(&template.with_created_at(created_at))
            .await
    }

    pub async fn update_profile(&self, meta: &Metadata) -> Result<Note, AppError> {
        let note = self.sign_and_publish(&events::metadata(meta)?).await?;
        MetadataCache::new(&self.cache).store(&note.pubkey, meta)?;
        Ok(note)
    }

    /// Send a kind-4 DM. Kind 4 is the NIP-04 event, so the payload uses
    /// NIP-04 encryption.
    pub async fn send_dm(&self, peer: &str, text: &str) -> Result<Note, AppError> {
        let keys = self.keys()?;
        let peer = crate::protocol::keys::pubkey_hex(peer)?;
        let ciphertext = crypto::encrypt_dm(keys, &peer, text, DmScheme::Nip04)?;
        self.sign_and_publish(&events::encrypted_dm(&peer, ciphertext))
            .await
    }

    /// Both sides of a conversation, oldest first. Messages that cannot be
    /// decrypted show a placeholder.
    pub async fn conversation(&self, peer: &str) -> Result<Vec<DirectMessage>, AppError> {
        let keys = self.keys()?;
        let me = keys.public_key().to_hex();
        let peer = crate::protocol::keys::pubkey_hex(peer)?;

        let mut seen = HashSet::new();
        let mut messages: Vec<DirectMessage> = self
            .source
            .fetch_all(&filters::conversation(&me, &peer, None))
            .await?
            .into_iter()
            .filter(|n| seen.insert(n.id.clone()))
            .map(|n| DirectMessage {
                from_me: n.pubkey == me,
                text: crypto::decrypt_or_placeholder(keys, &peer, &n.content),
                created_at: n.created_at,
                id: n.id,
            })
            .collect();

        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(messages)
    }

    /// Messages from `peer` newer than the last time the conversation was
    /// viewed. Never viewed means everything is unread.
    pub async fn unread_count(&self, peer: &str) -> Result<usize, AppError> {
        let me = self.pubkey().ok_or(AppError::NotLoggedIn)?;
        let peer = crate::protocol::keys::pubkey_hex(peer)?;
        let last_viewed = LastViewedStore::new(&self.cache).get(&me, &peer)?;

        // first direction is peer -> me
        let mut directions = filters::conversation(&peer, &me, None);
        let incoming = directions.swap_remove(0);
        let unread = self
            .source
            .fetch(&incoming)
            .await?
            .iter()
            .filter(|n| last_viewed.is_none_or(|t| n.created_at > t))
            .map(|n| n.id.as_str())
            .collect::<HashSet<_>>()
            .len();
        Ok(unread)
    }

    pub fn mark_viewed(&self, peer: &str) -> Result<(), AppError> {
        let me = self.pubkey().ok_or(AppError::NotLoggedIn)?;
        let peer = crate::protocol::keys::pubkey_hex(peer)?;
        LastViewedStore::new(&self.cache).set(&me, &peer, events::now())?;
        Ok(())
    }
}
