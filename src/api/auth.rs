// SPDX-License-Identifier: MPL-2.0

//! Signed-timestamp bearer tokens for the backend API.
//!
//! The client signs `sha256("METHOD:path:timestamp")` with its Nostr key and
//! sends `Bearer base64("timestamp:signature_hex")`. The server recovers the
//! timestamp, rebuilds the payload from the request it received, and checks
//! the Schnorr signature against the caller's pubkey.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use nostr_sdk::nostr::secp256k1::Message;
use nostr_sdk::prelude::Keys;
use sha2::{Digest, Sha256};

/// The string that gets hashed and signed.
pub fn signing_payload(method: &str, path: &str, timestamp: u64) -> String {
    format!("{}:{}:{}", method.to_ascii_uppercase(), path, timestamp)
}

pub fn create_auth_header(keys: &Keys, method: &str, path: &str, timestamp: u64) -> String {
    let digest: [u8; 32] = Sha256::digest(signing_payload(method, path, timestamp)).into();
    let signature = keys.sign_schnorr(&Message::from_digest(digest));
    let token = format!("{}:{}", timestamp, signature);
    format!("Bearer {}", STANDARD.encode(token))
}
