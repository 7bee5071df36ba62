// SPDX-License-Identifier: MPL-2.0

pub const APP_ID: &str = "io.github.nostrfeed.NostrFeed";
pub const APP_NAME: &str = "NostrFeed";

/// Directory name under the XDG data dir for per-user caches
pub const APP_DATA_DIR: &str = "nostrfeed";

pub const DEFAULT_API_URL: &str = "https://api.nostrfeed.app/";

/// Environment variable that overrides the backend API base URL
pub const API_URL_ENV: &str = "NOSTRFEED_API_URL";

pub const DEFAULT_RELAYS: &[&str] = &[
    "wss://relay.damus.io",
    "wss://nos.lol",
    "wss://relay.nostr.band",
    "wss://relay.primal.net",
];

/// Maximum relay/HTTP operations in flight at once
pub const MAX_CONCURRENT_REQUESTS: usize = 4;

/// Pending operations the throttle accepts before `submit` waits
pub const REQUEST_QUEUE_DEPTH: usize = 256;

/// Notes requested per feed page
pub const FEED_PAGE_SIZE: usize = 50;

/// Seconds to wait on relays for a single fetch
pub const RELAY_FETCH_TIMEOUT_SECS: u64 = 10;

pub const METADATA_TTL_SECS: i64 = 24 * 60 * 60;
pub const COUNTS_TTL_SECS: i64 = 60 * 60;
pub const NOTES_TTL_SECS: i64 = 24 * 60 * 60;
