// SPDX-License-Identifier: MPL-2.0

//! Feed lists: notes sorted newest first, unique by id.
//!
//! Order is `created_at` descending; notes with the same `created_at` are
//! ordered by `id` ascending so the result never depends on arrival order.

use crate::protocol::{KIND_DELETION, Note};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Feed order: newer first, then lower id first.
fn feed_order(a: &Note, b: &Note) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

/// Position for `event`, or `None` if an element with its id is already there.
fn insertion_point(list: &[Note], event: &Note) -> Option<usize> {
    let (Some(newest), Some(oldest)) = (list.first(), list.last()) else {
        return Some(0);
    };

    if feed_order(oldest, event) == Ordering::Less {
        return Some(list.len());
    }
    if feed_order(event, newest) == Ordering::Less {
        return Some(0);
    }

    match list.binary_search_by(|probe| feed_order(probe, event)) {
        Ok(_) => None,
        Err(index) => Some(index),
    }
}

/// Return a new list with `event` inserted at its sorted position.
///
/// `list` must already be in feed order with unique ids. If the event is
/// already present the list is returned unchanged.
pub fn insert_event_into_descending_list(list: &[Note], event: Note) -> Vec<Note> {
    match insertion_point(list, &event) {
        Some(index) => {
            let mut out = Vec::with_capacity(list.len() + 1);
            out.extend_from_slice(&list[..index]);
            out.push(event);
            out.extend_from_slice(&list[index..]);
            out
        }
        None => list.to_vec(),
    }
}

/// In-place variant of [`insert_event_into_descending_list`].
/// Returns whether the event was inserted.
pub fn insert_event_in_place(list: &mut Vec<Note>, event: Note) -> bool {
    match insertion_point(list, &event) {
        Some(index) => {
            list.insert(index, event);
            true
        }
        None => false,
    }
}

/// Merge two feed-ordered lists, keeping the first copy of each id.
pub fn merge_descending(a: &[Note], b: &[Note]) -> Vec<Note> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let mut seen = HashSet::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);

    while i < a.len() || j < b.len() {
        let next = match (a.get(i), b.get(j)) {
            (Some(x), Some(y)) if feed_order(x, y) != Ordering::Greater => {
                i += 1;
                x
            }
            (Some(_), Some(y)) => {
                j += 1;
                y
            }
            (Some(x), None) => {
                i += 1;
                x
            }
            (None, Some(y)) => {
                j += 1;
                y
            }
            (None, None) => break,
        };
        if seen.insert(next.id.clone()) {
            out.push(next.clone());
        }
    }

    out
}

/// Mark notes referenced by kind-5 deletions from the same author.
/// Returns how many notes were newly marked. Notes stay in the list.
pub fn apply_deletions(list: &mut [Note], deletions: &[Note]) -> usize {
    let deleted: HashSet<(&str, &str)> = deletions
        .iter()
        .filter(|d| d.kind == KIND_DELETION)
        .flat_map(|d| {
            d.referenced_event_ids()
                .into_iter()
                .map(move |id| (d.pubkey.as_str(), id))
        })
        .collect();

    let mut marked = 0;
    for note in list.iter_mut() {
        if !note.deleted && deleted.contains(&(note.pubkey.as_str(), note.id.as_str())) {
            note.deleted = true;
            marked += 1;
        }
    }
    marked
}

/// `until` cursor for the page after this list.
pub fn oldest_timestamp(list: &[Note]) -> Option<u64> {
    list.last().map(|n| n.created_at)
}

/// Whether the list is in feed order with unique ids.
pub fn is_feed_ordered(list: &[Note]) -> bool {
    let mut ids = HashSet::with_capacity(list.len());
    list.iter().all(|n| ids.insert(n.id.as_str()))
        && list
            .windows(2)
            .all(|w| feed_order(&w[0], &w[1]) == Ordering::Less)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: &str, created_at: u64) -> Note {
        Note {
            id: id.to_string(),
            pubkey: "author".to_string(),
            created_at,
            kind: 1,
            tags: Vec::new(),
            content: String::new(),
            sig: String::new(),
            deleted: false,
            reposted_event: None,
            replied_event: None,
        }
    }

    fn timestamps(list: &[Note]) -> Vec<u64> {
        list.iter().map(|n| n.created_at).collect()
    }

    fn build(events: &[(&str, u64)]) -> Vec<Note> {
        events.iter().fold(Vec::new(), |list, (id, ts)| {
            insert_event_into_descending_list(&list, note(id, *ts))
        })
    }

    #[test]
    fn test_insert_into_middle() {
        let list = vec![note("a", 100), note("b", 90), note("c", 80)];
        let out = insert_event_into_descending_list(&list, note("d", 95));
        assert_eq!(timestamps(&out), vec![100, 95, 90, 80]);
        // input untouched
        assert_eq!(timestamps(&list), vec![100, 90, 80]);
    }

    #[test]
    fn test_insert_into_empty() {
        let out = insert_event_into_descending_list(&[], note("a", 5));
        assert_eq!(timestamps(&out), vec![5]);
    }

    #[test]
    fn test_older_than_oldest_appends() {
        let list = vec![note("a", 100), note("b", 90)];
        let out = insert_event_into_descending_list(&list, note("c", 10));
        assert_eq!(timestamps(&out), vec![100, 90, 10]);
    }

    #[test]
    fn test_newer_than_newest_prepends() {
        let list = vec![note("a", 100), note("b", 90)];
        let out = insert_event_into_descending_list(&list, note("c", 200));
        assert_eq!(timestamps(&out), vec![200, 100, 90]);
    }

    #[test]
    fn test_duplicate_is_noop() {
        let list = vec![note("a", 100), note("b", 90), note("c", 80)];
        for existing in &list {
            let out = insert_event_into_descending_list(&list, existing.clone());
            assert_eq!(out, list);
        }

        let mut in_place = list.clone();
        assert!(!insert_event_in_place(&mut in_place, note("b", 90)));
        assert_eq!(in_place, list);
    }

    #[test]
    fn test_equal_timestamps_ordered_by_id() {
        let list = build(&[("m", 50), ("z", 50), ("a", 50), ("q", 60)]);
        let ids: Vec<&str> = list.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["q", "a", "m", "z"]);
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let events = [
            ("a", 10),
            ("b", 40),
            ("c", 20),
            ("d", 40),
            ("e", 30),
            ("f", 10),
            ("g", 50),
        ];
        let mut sorted = events.to_vec();
        sorted.sort_by(|x, y| y.1.cmp(&x.1).then(x.0.cmp(y.0)));
        let expected = build(&sorted);
        assert!(is_feed_ordered(&expected));

        let mut reversed = events.to_vec();
        reversed.reverse();
        let interleaved: Vec<_> = events
            .iter()
            .step_by(2)
            .chain(events.iter().skip(1).step_by(2))
            .copied()
            .collect();

        for order in [events.to_vec(), reversed, interleaved] {
            assert_eq!(build(&order), expected);
        }
    }

    #[test]
    fn test_repeated_inserts_stay_unique() {
        let list = build(&[("a", 3), ("b", 2), ("a", 3), ("c", 1), ("b", 2)]);
        assert_eq!(list.len(), 3);
        assert!(is_feed_ordered(&list));
    }

    #[test]
    fn test_merge_descending() {
        let a = vec![note("a", 100), note("c", 80)];
        let b = vec![note("b", 90), note("c", 80), note("d", 70)];
        let merged = merge_descending(&a, &b);
        assert_eq!(timestamps(&merged), vec![100, 90, 80, 70]);
        assert!(is_feed_ordered(&merged));
    }

    #[test]
    fn test_apply_deletions_same_author_only() {
        let mut list = vec![note("a", 100), note("b", 90)];
        let mut by_author = note("del1", 120);
        by_author.kind = KIND_DELETION;
        by_author.tags = vec![vec!["e".into(), "a".into()]];

        let mut by_stranger = by_author.clone();
        by_stranger.id = "del2".into();
        by_stranger.pubkey = "someone-else".into();
        by_stranger.tags = vec![vec!["e".into(), "b".into()]];

        assert_eq!(apply_deletions(&mut list, &[by_author.clone(), by_stranger]), 1);
        assert!(list[0].deleted);
        assert!(!list[1].deleted);
        // already marked
        assert_eq!(apply_deletions(&mut list, &[by_author]), 0);
    }

    #[test]
    fn test_oldest_timestamp() {
        assert_eq!(oldest_timestamp(&[]), None);
        assert_eq!(oldest_timestamp(&[note("a", 9), note("b", 3)]), Some(3));
    }
}
