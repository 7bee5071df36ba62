// SPDX-License-Identifier: MPL-2.0

pub mod content;
pub mod crypto;
pub mod events;
pub mod filters;
pub mod keys;
mod types;

pub use crypto::{CryptoError, DmScheme};
pub use events::{EventError, EventTemplate};
pub use filters::RelayFilter;
pub use keys::KeyError;
pub use types::{
    Algorithm, Counts, KIND_DELETION, KIND_ENCRYPTED_DM, KIND_FOLLOW_LIST, KIND_METADATA,
    KIND_REACTION, KIND_REPOST, KIND_TEXT_NOTE, Metadata, Note,
};
