// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

pub const KIND_METADATA: u16 = 0;
pub const KIND_TEXT_NOTE: u16 = 1;
pub const KIND_FOLLOW_LIST: u16 = 3;
pub const KIND_ENCRYPTED_DM: u16 = 4;
pub const KIND_DELETION: u16 = 5;
pub const KIND_REPOST: u16 = 6;
pub const KIND_REACTION: u16 = 7;

/// A signed Nostr event as the feed layer sees it.
///
/// The NIP-01 fields serialize in wire form, so a `Note` round-trips through
/// relay JSON. `deleted`, `reposted_event` and `replied_event` are derived on
/// the client and never leave it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub pubkey: String,
    pub created_at: u64,
    pub kind: u16,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    #[serde(default)]
    pub sig: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reposted_event: Option<Box<Note>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replied_event: Option<Box<Note>>,
}

impl Note {
    /// Values of every tag named `name` (the element after the name).
    pub fn tag_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags
            .iter()
            .filter(move |t| t.first().map(String::as_str) == Some(name))
            .filter_map(|t| t.get(1).map(String::as_str))
    }

    pub fn referenced_event_ids(&self) -> Vec<&str> {
        self.tag_values("e").collect()
    }

    pub fn referenced_pubkeys(&self) -> Vec<&str> {
        self.tag_values("p").collect()
    }

    pub fn hashtags(&self) -> Vec<&str> {
        self.tag_values("t").collect()
    }

    /// Parent event id per NIP-10: the `reply`-marked `e` tag, then the
    /// `root`-marked one, then the last positional `e` tag.
    pub fn reply_parent_id(&self) -> Option<&str> {
        let e_tags: Vec<&Vec<String>> = self
            .tags
            .iter()
            .filter(|t| t.first().map(String::as_str) == Some("e") && t.len() >= 2)
            .collect();

        let marked = |marker: &str| {
            e_tags
                .iter()
                .find(|t| t.get(3).map(String::as_str) == Some(marker))
                .map(|t| t[1].as_str())
        };

        marked("reply")
            .or_else(|| marked("root"))
            .or_else(|| {
                e_tags
                    .iter()
                    .rev()
                    .find(|t| t.get(3).is_none_or(|m| m.is_empty()))
                    .map(|t| t[1].as_str())
            })
    }

    /// Root event id of the thread this note belongs to, if it is a reply.
    pub fn thread_root_id(&self) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| {
                t.first().map(String::as_str) == Some("e")
                    && t.get(3).map(String::as_str) == Some("root")
            })
            .and_then(|t| t.get(1).map(String::as_str))
            .or_else(|| self.referenced_event_ids().first().copied())
    }

    pub fn is_reply(&self) -> bool {
        self.kind == KIND_TEXT_NOTE && self.reply_parent_id().is_some()
    }

    pub fn is_repost(&self) -> bool {
        self.kind == KIND_REPOST
    }
}

/// Kind-0 profile content. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nip05: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lud16: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl Metadata {
    /// Parse kind-0 content; malformed JSON yields an empty profile.
    pub fn from_content(content: &str) -> Self {
        serde_json::from_str(content).unwrap_or_default()
    }
}

/// Engagement counts for one note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub reactions: u32,
    pub reposts: u32,
    pub replies: u32,
}

/// A user-configured feed filter ("bring your own algorithm").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Algorithm {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub byo_posts: bool,
    #[serde(default)]
    pub byo_reposts: bool,
    #[serde(default)]
    pub byo_replies: bool,
    #[serde(default)]
    pub byo_reactions: bool,
    #[serde(default = "default_degrees")]
    pub byo_degrees: u32,
    #[serde(default)]
    pub is_public: bool,
}

fn default_degrees() -> u32 {
    1
}

impl Algorithm {
    /// The plain "Following" feed: posts and reposts from direct follows.
    pub fn following() -> Self {
        Self {
            id: "following".to_string(),
            name: "Following".to_string(),
            description: Some("Notes from the people you follow".to_string()),
            byo_posts: true,
            byo_reposts: true,
            byo_replies: false,
            byo_reactions: false,
            byo_degrees: 1,
            is_public: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_with_tags(tags: Vec<Vec<&str>>) -> Note {
        Note {
            id: "a".repeat(64),
            pubkey: "b".repeat(64),
            created_at: 1,
            kind: KIND_TEXT_NOTE,
            tags: tags
                .into_iter()
                .map(|t| t.into_iter().map(String::from).collect())
                .collect(),
            content: String::new(),
            sig: String::new(),
            deleted: false,
            reposted_event: None,
            replied_event: None,
        }
    }

    #[test]
    fn test_marked_reply_tag_wins() {
        let note = note_with_tags(vec![
            vec!["e", "root-id", "", "root"],
            vec!["e", "parent-id", "", "reply"],
        ]);
        assert_eq!(note.reply_parent_id(), Some("parent-id"));
        assert_eq!(note.thread_root_id(), Some("root-id"));
        assert!(note.is_reply());
    }

    #[test]
    fn test_root_only_reply() {
        let note = note_with_tags(vec![vec!["e", "root-id", "", "root"]]);
        assert_eq!(note.reply_parent_id(), Some("root-id"));
    }

    #[test]
    fn test_positional_e_tags_use_last() {
        let note = note_with_tags(vec![vec!["e", "first"], vec!["e", "second"]]);
        assert_eq!(note.reply_parent_id(), Some("second"));
        assert_eq!(note.thread_root_id(), Some("first"));
    }

    #[test]
    fn test_plain_note_is_not_reply() {
        let note = note_with_tags(vec![vec!["t", "nostr"], vec!["p", "someone"]]);
        assert!(!note.is_reply());
        assert_eq!(note.hashtags(), vec!["nostr"]);
        assert_eq!(note.referenced_pubkeys(), vec!["someone"]);
    }

    #[test]
    fn test_metadata_lenient_parse() {
        let meta = Metadata::from_content(r#"{"name":"alice","lud16":"a@b.c","extra":1}"#);
        assert_eq!(meta.name.as_deref(), Some("alice"));
        assert_eq!(meta.lud16.as_deref(), Some("a@b.c"));

        assert_eq!(Metadata::from_content("not json"), Metadata::default());
    }

    #[test]
    fn test_algorithm_wire_names() {
        let json = r#"{"id":"x","name":"Mine","byoPosts":true,"byoReactions":true,"byoDegrees":2}"#;
        let algo: Algorithm = serde_json::from_str(json).unwrap();
        assert!(algo.byo_posts);
        assert!(!algo.byo_reposts);
        assert!(algo.byo_reactions);
        assert_eq!(algo.byo_degrees, 2);
    }

    #[test]
    fn test_note_serializes_wire_fields_only() {
        let note = note_with_tags(vec![]);
        let value = serde_json::to_value(&note).unwrap();
        assert!(value.get("deleted").is_none());
        assert!(value.get("reposted_event").is_none());
        assert_eq!(value["kind"], 1);
    }
}
