// SPDX-License-Identifier: MPL-2.0

//! Relay query filters.
//!
//! [`RelayFilter`] is plain data in NIP-01 wire form so it can be built,
//! compared and logged without touching the relay library; it converts to a
//! `nostr_sdk::Filter` at the point of use.

use crate::config::FEED_PAGE_SIZE;
use crate::protocol::types::{
    Algorithm, KIND_DELETION, KIND_ENCRYPTED_DM, KIND_FOLLOW_LIST, KIND_METADATA, KIND_REACTION,
    KIND_REPOST, KIND_TEXT_NOTE,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kinds: Option<Vec<u16>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,
    #[serde(rename = "#e", default, skip_serializing_if = "Option::is_none")]
    pub e_tags: Option<Vec<String>>,
    #[serde(rename = "#p", default, skip_serializing_if = "Option::is_none")]
    pub p_tags: Option<Vec<String>>,
    #[serde(rename = "#t", default, skip_serializing_if = "Option::is_none")]
    pub t_tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl RelayFilter {
    pub fn to_nostr(&self) -> Result<nostr_sdk::prelude::Filter, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(self)?)
    }

    /// Whether a note satisfies this filter (used for in-memory sources).
    pub fn matches(&self, note: &crate::protocol::Note) -> bool {
        fn contains(set: &Option<Vec<String>>, value: &str) -> bool {
            set.as_ref().is_none_or(|s| s.iter().any(|v| v == value))
        }
        fn any_tag(set: &Option<Vec<String>>, note: &crate::protocol::Note, name: &str) -> bool {
            set.as_ref()
                .is_none_or(|s| note.tag_values(name).any(|v| s.iter().any(|x| x == v)))
        }

        contains(&self.ids, &note.id)
            && contains(&self.authors, &note.pubkey)
            && self.kinds.as_ref().is_none_or(|k| k.contains(&note.kind))
            && any_tag(&self.e_tags, note, "e")
            && any_tag(&self.p_tags, note, "p")
            && any_tag(&self.t_tags, note, "t")
            && self.since.is_none_or(|s| note.created_at >= s)
            && self.until.is_none_or(|u| note.created_at <= u)
    }
}

/// 64-char lowercase hex, the only key form relays accept in filters.
pub fn is_hex_key(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn hex_keys(values: &[String]) -> Vec<String> {
    values.iter().filter(|v| is_hex_key(v)).cloned().collect()
}

/// Event kinds selected by an algorithm. Replies are kind-1 notes, so posts
/// and replies share a kind. Nothing selected means plain notes.
pub fn algorithm_kinds(algo: &Algorithm) -> Vec<u16> {
    let mut kinds = Vec::new();
    let selected = [
        (algo.byo_posts, KIND_TEXT_NOTE),
        (algo.byo_reposts, KIND_REPOST),
        (algo.byo_replies, KIND_TEXT_NOTE),
        (algo.byo_reactions, KIND_REACTION),
    ];
    for (enabled, kind) in selected {
        if enabled && !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    if kinds.is_empty() {
        kinds.push(KIND_TEXT_NOTE);
    }
    kinds
}

/// Feed filter for a user-configured algorithm.
///
/// Authors are the direct follows. Expansion beyond one degree of separation
/// is not implemented; callers that want it pass an already expanded set.
pub fn construct_filter_from_byo_algo(
    algo: &Algorithm,
    follows: &[String],
    since: Option<u64>,
) -> RelayFilter {
    if algo.byo_degrees > 1 {
        tracing::debug!(
            "algorithm {} asks for {} degrees; using direct follows only",
            algo.id,
            algo.byo_degrees
        );
    }

    RelayFilter {
        kinds: Some(algorithm_kinds(algo)),
        authors: Some(hex_keys(follows)),
        since,
        limit: Some(FEED_PAGE_SIZE),
        ..Default::default()
    }
}

/// Whether a fetched note belongs in an algorithm's feed. The relay filter
/// cannot tell posts from replies, so this refines it client-side.
pub fn algorithm_accepts(algo: &Algorithm, note: &crate::protocol::Note) -> bool {
    match note.kind {
        KIND_TEXT_NOTE if note.is_reply() => algo.byo_replies || !any_selected(algo),
        KIND_TEXT_NOTE => algo.byo_posts || !any_selected(algo),
        KIND_REPOST => algo.byo_reposts,
        KIND_REACTION => algo.byo_reactions,
        _ => false,
    }
}

fn any_selected(algo: &Algorithm) -> bool {
    algo.byo_posts || algo.byo_reposts || algo.byo_replies || algo.byo_reactions
}

pub fn profile_notes(pubkey: &str, until: Option<u64>) -> RelayFilter {
    RelayFilter {
        kinds: Some(vec![KIND_TEXT_NOTE, KIND_REPOST]),
        authors: Some(vec![pubkey.to_string()]),
        until,
        limit: Some(FEED_PAGE_SIZE),
        ..Default::default()
    }
}

pub fn metadata(pubkeys: &[String]) -> RelayFilter {
    RelayFilter {
        kinds: Some(vec![KIND_METADATA]),
        authors: Some(hex_keys(pubkeys)),
        ..Default::default()
    }
}

pub fn follow_list(pubkey: &str) -> RelayFilter {
    RelayFilter {
        kinds: Some(vec![KIND_FOLLOW_LIST]),
        authors: Some(vec![pubkey.to_string()]),
        limit: Some(1),
        ..Default::default()
    }
}

pub fn note_by_id(id: &str) -> RelayFilter {
    RelayFilter {
        ids: Some(vec![id.to_string()]),
        limit: Some(1),
        ..Default::default()
    }
}

pub fn replies_to(note_id: &str) -> RelayFilter {
    RelayFilter {
        kinds: Some(vec![KIND_TEXT_NOTE]),
        e_tags: Some(vec![note_id.to_string()]),
        ..Default::default()
    }
}

/// Replies, reposts and reactions referencing any of the notes.
pub fn engagement(note_ids: &[String]) -> RelayFilter {
    RelayFilter {
        kinds: Some(vec![KIND_TEXT_NOTE, KIND_REPOST, KIND_REACTION]),
        e_tags: Some(note_ids.to_vec()),
        ..Default::default()
    }
}

pub fn deletions(note_ids: &[String]) -> RelayFilter {
    RelayFilter {
        kinds: Some(vec![KIND_DELETION]),
        e_tags: Some(note_ids.to_vec()),
        ..Default::default()
    }
}

pub fn hashtag(tag: &str, until: Option<u64>) -> RelayFilter {
    RelayFilter {
        kinds: Some(vec![KIND_TEXT_NOTE]),
        t_tags: Some(vec![tag.trim_start_matches('#').to_lowercase()]),
        until,
        limit: Some(FEED_PAGE_SIZE),
        ..Default::default()
    }
}

/// Both directions of a DM conversation.
pub fn conversation(me: &str, peer: &str, since: Option<u64>) -> Vec<RelayFilter> {
    let direction = |from: &str, to: &str| RelayFilter {
        kinds: Some(vec![KIND_ENCRYPTED_DM]),
        authors: Some(vec![from.to_string()]),
        p_tags: Some(vec![to.to_string()]),
        since,
        ..Default::default()
    };
    vec![direction(me, peer), direction(peer, me)]
}

/// Every DM addressed to `me`.
pub fn inbox(me: &str, since: Option<u64>) -> RelayFilter {
    RelayFilter {
        kinds: Some(vec![KIND_ENCRYPTED_DM]),
        p_tags: Some(vec![me.to_string()]),
        since,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Note;

    fn algo(posts: bool, reposts: bool, replies: bool, reactions: bool) -> Algorithm {
        Algorithm {
            id: "test".into(),
            name: "Test".into(),
            description: None,
            byo_posts: posts,
            byo_reposts: reposts,
            byo_replies: replies,
            byo_reactions: reactions,
            byo_degrees: 1,
            is_public: false,
        }
    }

    fn key(c: char) -> String {
        c.to_string().repeat(64)
    }

    #[test]
    fn test_posts_only_is_kind_1() {
        let filter = construct_filter_from_byo_algo(&algo(true, false, false, false), &[], None);
        assert_eq!(filter.kinds, Some(vec![1]));
    }

    #[test]
    fn test_nothing_selected_defaults_to_kind_1() {
        let filter = construct_filter_from_byo_algo(&algo(false, false, false, false), &[], None);
        assert_eq!(filter.kinds, Some(vec![1]));
    }

    #[test]
    fn test_all_selected_kinds_deduplicated() {
        let filter = construct_filter_from_byo_algo(&algo(true, true, true, true), &[], None);
        assert_eq!(filter.kinds, Some(vec![1, 6, 7]));
    }

    #[test]
    fn test_replies_and_reactions() {
        let filter = construct_filter_from_byo_algo(&algo(false, false, true, true), &[], None);
        assert_eq!(filter.kinds, Some(vec![1, 7]));
    }

    #[test]
    fn test_authors_and_since() {
        let follows = vec![key('a'), "not-a-key".to_string(), key('b')];
        let mut a = algo(true, false, false, false);
        a.byo_degrees = 3;

        let filter = construct_filter_from_byo_algo(&a, &follows, Some(1_700_000_000));
        assert_eq!(filter.authors, Some(vec![key('a'), key('b')]));
        assert_eq!(filter.since, Some(1_700_000_000));
        assert_eq!(filter.limit, Some(FEED_PAGE_SIZE));
    }

    #[test]
    fn test_wire_form() {
        let filter = RelayFilter {
            kinds: Some(vec![4]),
            p_tags: Some(vec![key('c')]),
            since: Some(10),
            ..Default::default()
        };
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json["kinds"], serde_json::json!([4]));
        assert_eq!(json["#p"], serde_json::json!([key('c')]));
        assert!(json.get("authors").is_none());
    }

    #[test]
    fn test_converts_to_nostr_filter() {
        let filter = construct_filter_from_byo_algo(&algo(true, true, false, false), &[key('a')], Some(5));
        let nostr_filter = filter.to_nostr().unwrap();
        let back: RelayFilter =
            serde_json::from_value(serde_json::to_value(&nostr_filter).unwrap()).unwrap();
        assert_eq!(back.since, Some(5));
        assert_eq!(back.authors, Some(vec![key('a')]));
    }

    #[test]
    fn test_conversation_covers_both_directions() {
        let filters = conversation(&key('a'), &key('b'), None);
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].authors, Some(vec![key('a')]));
        assert_eq!(filters[1].p_tags, Some(vec![key('a')]));
    }

    #[test]
    fn test_matches() {
        let note = Note {
            id: key('1'),
            pubkey: key('a'),
            created_at: 100,
            kind: 1,
            tags: vec![vec!["t".into(), "rust".into()]],
            content: String::new(),
            sig: String::new(),
            deleted: false,
            reposted_event: None,
            replied_event: None,
        };
        assert!(hashtag("#Rust", None).matches(&note));
        assert!(profile_notes(&key('a'), Some(100)).matches(&note));
        assert!(!profile_notes(&key('a'), Some(99)).matches(&note));
        assert!(!metadata(&[key('a')]).matches(&note));
    }

    #[test]
    fn test_algorithm_accepts() {
        let reply = Note {
            id: key('1'),
            pubkey: key('a'),
            created_at: 1,
            kind: 1,
            tags: vec![vec!["e".into(), key('2'), "".into(), "root".into()]],
            content: String::new(),
            sig: String::new(),
            deleted: false,
            reposted_event: None,
            replied_event: None,
        };
        let post = Note {
            tags: Vec::new(),
            ..reply.clone()
        };

        let posts_only = algo(true, false, false, false);
        assert!(algorithm_accepts(&posts_only, &post));
        assert!(!algorithm_accepts(&posts_only, &reply));

        let replies_only = algo(false, false, true, false);
        assert!(algorithm_accepts(&replies_only, &reply));
        assert!(!algorithm_accepts(&replies_only, &post));
    }
}
