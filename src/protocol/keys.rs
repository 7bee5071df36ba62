// SPDX-License-Identifier: MPL-2.0

//! Key generation and NIP-19 (npub/nsec/note) conversions.

use nostr_sdk::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("invalid secret key: {0}")]
    InvalidSecret(String),
    #[error("invalid public key: {0}")]
    InvalidPublic(String),
    #[error("invalid event id: {0}")]
    InvalidEventId(String),
    #[error("bech32 encoding failed: {0}")]
    Encoding(String),
}

pub fn generate() -> Keys {
    Keys::generate()
}

/// Parse an `nsec1...` or 64-char hex secret key.
pub fn parse_secret(input: &str) -> Result<Keys, KeyError> {
    Keys::parse(input.trim()).map_err(|e| KeyError::InvalidSecret(e.to_string()))
}

/// Parse an `npub1...`, `nostr:npub1...` or hex public key.
pub fn parse_public(input: &str) -> Result<PublicKey, KeyError> {
    let trimmed = input.trim();
    let bare = trimmed.strip_prefix("nostr:").unwrap_or(trimmed);
    PublicKey::parse(bare).map_err(|e| KeyError::InvalidPublic(e.to_string()))
}

/// Hex public key from any accepted public key form.
pub fn pubkey_hex(input: &str) -> Result<String, KeyError> {
    parse_public(input).map(|pk| pk.to_hex())
}

pub fn npub(public_key: &PublicKey) -> Result<String, KeyError> {
    public_key
        .to_bech32()
        .map_err(|e| KeyError::Encoding(e.to_string()))
}

/// `npub1...` for a hex public key.
pub fn npub_from_hex(hex: &str) -> Result<String, KeyError> {
    let pk = PublicKey::from_hex(hex).map_err(|e| KeyError::InvalidPublic(e.to_string()))?;
    npub(&pk)
}

pub fn nsec(keys: &Keys) -> Result<String, KeyError> {
    keys.secret_key()
        .to_bech32()
        .map_err(|e| KeyError::Encoding(e.to_string()))
}

/// `note1...` for a hex event id.
pub fn note_id_bech32(id: &str) -> Result<String, KeyError> {
    let event_id = EventId::from_hex(id).map_err(|e| KeyError::InvalidEventId(e.to_string()))?;
    event_id
        .to_bech32()
        .map_err(|e| KeyError::Encoding(e.to_string()))
}

/// Abbreviated npub for display, e.g. `npub1abcd...wxyz`.
/// Falls back to the abbreviated input if it is not a valid key.
pub fn short_npub(pubkey_hex: &str) -> String {
    let full = npub_from_hex(pubkey_hex).unwrap_or_else(|_| pubkey_hex.to_string());
    let chars: Vec<char> = full.chars().collect();
    if chars.len() <= 16 {
        return full;
    }
    let head: String = chars[..9].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
