// SPDX-License-Identifier: MPL-2.0

//! Event templates for everything the client publishes, plus conversion
//! between `nostr_sdk` events and our own [`Note`].

use crate::protocol::content;
use crate::protocol::types::{
    KIND_DELETION, KIND_ENCRYPTED_DM, KIND_FOLLOW_LIST, KIND_METADATA, KIND_REACTION,
    KIND_REPOST, KIND_TEXT_NOTE, Metadata, Note,
};
use nostr_sdk::prelude::*;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventError {
    #[error("invalid tag {0:?}: {1}")]
    InvalidTag(Vec<String>, String),
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid event: {0}")]
    Invalid(String),
}

/// An unsigned event. The pubkey comes from the signing keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTemplate {
    pub kind: u16,
    pub created_at: u64,
    pub tags: Vec<Vec<String>>,
    pub content: String,
}

impl EventTemplate {
    pub fn new(kind: u16, content: impl Into<String>, tags: Vec<Vec<String>>) -> Self {
        Self {
            kind,
            created_at: now(),
            tags,
            content: content.into(),
        }
    }

    pub fn with_created_at(mut self, created_at: u64) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Current Unix time in seconds
pub fn now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

fn tag(name: &str, values: &[&str]) -> Vec<String> {
    std::iter::once(name)
        .chain(values.iter().copied())
        .map(String::from)
        .collect()
}

/// Kind-1 note; hashtags and `nostr:` references in the text become tags.
pub fn text_note(text: &str) -> EventTemplate {
    EventTemplate::new(KIND_TEXT_NOTE, text, content::content_tags(text))
}

/// Kind-1 reply with NIP-10 marked `e` tags and the thread's `p` tags.
pub fn reply(parent: &Note, text: &str) -> EventTemplate {
    let mut tags = Vec::new();

    match parent.thread_root_id().filter(|_| parent.is_reply()) {
        Some(root) => {
            tags.push(tag("e", &[root, "", "root"]));
            tags.push(tag("e", &[&parent.id, "", "reply"]));
        }
        None => tags.push(tag("e", &[&parent.id, "", "root"])),
    }

    let mut seen = HashSet::new();
    let pubkeys = std::iter::once(parent.pubkey.as_str()).chain(parent.referenced_pubkeys());
    for pk in pubkeys {
        if seen.insert(pk.to_string()) {
            tags.push(tag("p", &[pk]));
        }
    }

    for extra in content::content_tags(text) {
        if extra.first().map(String::as_str) == Some("p") && !seen.insert(extra[1].clone()) {
            continue;
        }
        tags.push(extra);
    }

    EventTemplate::new(KIND_TEXT_NOTE, text, tags)
}

/// Kind-6 repost embedding the original note as JSON content.
pub fn repost(note: &Note) -> Result<EventTemplate, EventError> {
    let embedded = serde_json::to_string(&wire_json(note))?;
    Ok(EventTemplate::new(
        KIND_REPOST,
        embedded,
        vec![tag("e", &[&note.id]), tag("p", &[&note.pubkey])],
    ))
}

/// Kind-7 reaction; `"+"` is a like.
pub fn reaction(note: &Note, content: &str) -> EventTemplate {
    EventTemplate::new(
        KIND_REACTION,
        content,
        vec![
            tag("e", &[&note.id]),
            tag("p", &[&note.pubkey]),
            tag("k", &[&note.kind.to_string()]),
        ],
    )
}

/// Kind-5 deletion request for the given event ids.
pub fn deletion(ids: &[String], reason: Option<&str>) -> EventTemplate {
    let tags = ids.iter().map(|id| tag("e", &[id])).collect();
    EventTemplate::new(KIND_DELETION, reason.unwrap_or_default(), tags)
}

/// Kind-3 follow list with one `p` tag per followed pubkey.
pub fn follow_list(follows: &[String]) -> EventTemplate {
    let tags = follows.iter().map(|pk| tag("p", &[pk])).collect();
    EventTemplate::new(KIND_FOLLOW_LIST, "", tags)
}

/// Follow list with `pubkey` added (no-op if already followed).
pub fn follow(current: &[String], pubkey: &str) -> EventTemplate {
    let mut follows = current.to_vec();
    if !follows.iter().any(|pk| pk == pubkey) {
        follows.push(pubkey.to_string());
    }
    follow_list(&follows)
}

/// Follow list with `pubkey` removed.
pub fn unfollow(current: &[String], pubkey: &str) -> EventTemplate {
    let follows: Vec<String> = current.iter().filter(|pk| *pk != pubkey).cloned().collect();
    follow_list(&follows)
}

/// Followed pubkeys from a kind-3 event, in tag order, without duplicates.
pub fn follows_from_note(note: &Note) -> Vec<String> {
    let mut seen = HashSet::new();
    note.referenced_pubkeys()
        .into_iter()
        .filter(|pk| seen.insert(*pk))
        .map(String::from)
        .collect()
}

pub fn metadata(meta: &Metadata) -> Result<EventTemplate, EventError> {
    Ok(EventTemplate::new(
        KIND_METADATA,
        serde_json::to_string(meta)?,
        Vec::new(),
    ))
}

/// Kind-4 direct message. `ciphertext` must already be encrypted for `recipient`.
pub fn encrypted_dm(recipient: &str, ciphertext: String) -> EventTemplate {
    EventTemplate::new(KIND_ENCRYPTED_DM, ciphertext, vec![tag("p", &[recipient])])
}

/// Sign a template with the given keys.
pub fn sign(template: &EventTemplate, keys: &Keys) -> Result<Note, EventError> {
    let tags = template
        .tags
        .iter()
        .map(|t| Tag::parse(t.clone()).map_err(|e| EventError::InvalidTag(t.clone(), e.to_string())))
        .collect::<Result<Vec<Tag>, EventError>>()?;

    let event = EventBuilder::new(Kind::from(template.kind), template.content.clone())
        .tags(tags)
        .custom_created_at(Timestamp::from(template.created_at))
        .sign_with_keys(keys)
        .map_err(|e| EventError::Signing(e.to_string()))?;

    note_from_event(&event)
}

/// Convert a relay event into a [`Note`], resolving an embedded repost.
pub fn note_from_event(event: &Event) -> Result<Note, EventError> {
    let mut note: Note = serde_json::from_value(serde_json::to_value(event)?)?;
    note.reposted_event = repost_target(&note).map(Box::new);
    Ok(note)
}

/// Parse a note from NIP-01 JSON.
pub fn note_from_json(json: &str) -> Result<Note, EventError> {
    Ok(serde_json::from_str(json)?)
}

/// Convert back into a `nostr_sdk` event (for publishing).
pub fn note_to_event(note: &Note) -> Result<Event, EventError> {
    Ok(serde_json::from_value(wire_json(note))?)
}

/// Check id and signature.
pub fn verify(note: &Note) -> Result<(), EventError> {
    note_to_event(note)?
        .verify()
        .map_err(|e| EventError::Invalid(e.to_string()))
}

/// The original note embedded in a kind-6 repost, if the content carries one.
pub fn repost_target(note: &Note) -> Option<Note> {
    if note.kind != KIND_REPOST || note.content.trim().is_empty() {
        return None;
    }
    note_from_json(&note.content).ok()
}

/// The seven NIP-01 fields only.
fn wire_json(note: &Note) -> serde_json::Value {
    serde_json::json!({
        "id": note.id,
        "pubkey": note.pubkey,
        "created_at": note.created_at,
        "kind": note.kind,
        "tags": note.tags,
        "content": note.content,
        "sig": note.sig,
    })
}
