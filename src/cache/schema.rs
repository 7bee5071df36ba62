// SPDX-License-Identifier: MPL-2.0

/// SQL schema for the cache database
pub const SCHEMA: &str = r#"
PRAGMA user_version = 1;

-- metadata: kind-0 profile content per pubkey
CREATE TABLE IF NOT EXISTS metadata (
    pubkey TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    timestamp INTEGER NOT NULL
);

-- counts: engagement totals per note
CREATE TABLE IF NOT EXISTS counts (
    note_id TEXT PRIMARY KEY,
    reactions INTEGER NOT NULL DEFAULT 0,
    reposts INTEGER NOT NULL DEFAULT 0,
    replies INTEGER NOT NULL DEFAULT 0,
    timestamp INTEGER NOT NULL
);

-- cached_notes: last loaded feed page per algorithm, as a JSON array
CREATE TABLE IF NOT EXISTS cached_notes (
    algo_id TEXT PRIMARY KEY,
    notes_json TEXT NOT NULL,
    timestamp INTEGER NOT NULL
);

-- last_viewed: when a conversation was last opened, never expires
CREATE TABLE IF NOT EXISTS last_viewed (
    user_pubkey TEXT NOT NULL,
    peer_pubkey TEXT NOT NULL,
    viewed_at INTEGER NOT NULL,
    PRIMARY KEY (user_pubkey, peer_pubkey)
);

CREATE INDEX IF NOT EXISTS idx_metadata_timestamp ON metadata(timestamp);
CREATE INDEX IF NOT EXISTS idx_counts_timestamp ON counts(timestamp);
"#;
