// SPDX-License-Identifier: MPL-2.0

use crate::protocol::{Counts, KIND_REACTION, KIND_REPOST, KIND_TEXT_NOTE, Note};
use std::collections::{HashMap, HashSet};

/// Tally reactions, reposts and replies for `note_ids` from a batch of
/// engagement events.
///
/// Every requested id gets an entry, zeroed if nothing references it. An
/// event seen twice (two relays returning the same id) counts once, and an
/// event tagging the same note twice counts once for that note.
pub fn aggregate_counts(note_ids: &[String], events: &[Note]) -> HashMap<String, Counts> {
    let mut counts: HashMap<String, Counts> = note_ids
        .iter()
        .map(|id| (id.clone(), Counts::default()))
        .collect();
    let mut seen_events = HashSet::new();

    for event in events {
        if !seen_events.insert(event.id.as_str()) {
            continue;
        }

        let targets: HashSet<&str> = event
            .referenced_event_ids()
            .into_iter()
            .filter(|id| counts.contains_key(*id))
            .collect();

        for target in targets {
            let Some(entry) = counts.get_mut(target) else {
                continue;
            };
            match event.kind {
                KIND_REACTION => entry.reactions += 1,
                KIND_REPOST => entry.reposts += 1,
                KIND_TEXT_NOTE => entry.replies += 1,
                _ => {}
            }
        }
    }

    counts
}
