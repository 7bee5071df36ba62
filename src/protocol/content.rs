// SPDX-License-Identifier: MPL-2.0

//! Note content scanning.
//!
//! Detects links, hashtags and `nostr:` references in note text with UTF-8
//! byte offsets, and turns them into the `t`/`p`/`q` tags that accompany a
//! published note.

use nostr_sdk::nostr::nips::nip19::{FromBech32, Nip19};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// A detected span in the note text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Link {
        byte_start: usize,
        byte_end: usize,
        uri: String,
    },
    Hashtag {
        byte_start: usize,
        byte_end: usize,
        tag: String,
    },
    /// `nostr:` reference pointing at a profile (npub/nprofile)
    Profile {
        byte_start: usize,
        byte_end: usize,
        pubkey: String,
    },
    /// `nostr:` reference pointing at an event (note/nevent)
    Event {
        byte_start: usize,
        byte_end: usize,
        id: String,
    },
}

impl Span {
    pub fn byte_range(&self) -> (usize, usize) {
        match self {
            Span::Link {
                byte_start,
                byte_end,
                ..
            }
            | Span::Hashtag {
                byte_start,
                byte_end,
                ..
            }
            | Span::Profile {
                byte_start,
                byte_end,
                ..
            }
            | Span::Event {
                byte_start,
                byte_end,
                ..
            } => (*byte_start, *byte_end),
        }
    }
}

// Compile regexes once.
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://[^\s<>\[\]\{}|\\^`\x00-\x1f\x7f]+").expect("valid url regex")
});

static NOSTR_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"nostr:((?:npub|nprofile|note|nevent)1[02-9ac-hj-np-z]+)")
        .expect("valid nostr reference regex")
});

static HASHTAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s\(\[])#([\p{L}\p{N}_]*\p{L}[\p{L}\p{N}_]*)").expect("valid hashtag regex")
});

const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp"];

fn overlaps(byte_start: usize, byte_end: usize, existing: &[Span]) -> bool {
    existing.iter().any(|s| {
        let (ss, se) = s.byte_range();
        byte_start < se && byte_end > ss
    })
}

/// Trim trailing punctuation that is likely sentence-ending, not part of the URL.
fn trim_url_trailing(url: &str) -> &str {
    url.trim_end_matches(|c| matches!(c, '.' | ',' | ';' | '!' | '?' | ')'))
}

/// Scan note text. Pure text processing, no network calls.
///
/// Detection order (for overlap prevention):
/// 1. `nostr:` references
/// 2. URLs
/// 3. Hashtags (skipped inside a URL)
pub fn parse_spans(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();

    for caps in NOSTR_REF_RE.captures_iter(text) {
        let (Some(full), Some(bech32)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Ok(decoded) = Nip19::from_bech32(bech32.as_str()) else {
            continue;
        };
        let span = match decoded {
            Nip19::Pubkey(pk) => Span::Profile {
                byte_start: full.start(),
                byte_end: full.end(),
                pubkey: pk.to_hex(),
            },
            Nip19::Profile(profile) => Span::Profile {
                byte_start: full.start(),
                byte_end: full.end(),
                pubkey: profile.public_key.to_hex(),
            },
            Nip19::EventId(id) => Span::Event {
                byte_start: full.start(),
                byte_end: full.end(),
                id: id.to_hex(),
            },
            Nip19::Event(event) => Span::Event {
                byte_start: full.start(),
                byte_end: full.end(),
                id: event.event_id.to_hex(),
            },
            _ => continue,
        };
        spans.push(span);
    }

    for m in URL_RE.find_iter(text) {
        let trimmed = trim_url_trailing(m.as_str());
        let byte_end = m.start() + trimmed.len();
        if !overlaps(m.start(), byte_end, &spans) {
            spans.push(Span::Link {
                byte_start: m.start(),
                byte_end,
                uri: trimmed.to_string(),
            });
        }
    }

    // The regex captures a leading boundary, so locate the '#' inside the match.
    for caps in HASHTAG_RE.captures_iter(text) {
        let (Some(full), Some(tag)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let hash_offset = text[full.start()..].find('#').unwrap_or(0);
        let byte_start = full.start() + hash_offset;
        let byte_end = tag.end();

        if !overlaps(byte_start, byte_end, &spans) {
            spans.push(Span::Hashtag {
                byte_start,
                byte_end,
                tag: tag.as_str().to_string(),
            });
        }
    }

    spans.sort_by_key(|s| s.byte_range().0);
    spans
}

/// Tags implied by the note text: `t` per hashtag (lower-cased), `p` per
/// profile reference, `q` per event reference. Each value appears once.
pub fn content_tags(text: &str) -> Vec<Vec<String>> {
    let mut seen = HashSet::new();
    let mut tags = Vec::new();

    for span in parse_spans(text) {
        let tag = match span {
            Span::Hashtag { tag, .. } => vec!["t".to_string(), tag.to_lowercase()],
            Span::Profile { pubkey, .. } => vec!["p".to_string(), pubkey],
            Span::Event { id, .. } => vec!["q".to_string(), id],
            Span::Link { .. } => continue,
        };
        if seen.insert(tag.clone()) {
            tags.push(tag);
        }
    }

    tags
}

/// Image links in the note text, in order of appearance.
pub fn image_urls(text: &str) -> Vec<String> {
    parse_spans(text)
        .into_iter()
        .filter_map(|s| match s {
            Span::Link { uri, .. } => {
                let path = uri.split(['?', '#']).next().unwrap_or(uri.as_str()).to_lowercase();
                IMAGE_EXTENSIONS
                    .iter()
                    .any(|ext| path.ends_with(ext))
                    .then_some(uri)
            }
            _ => None,
        })
        .collect()
}
