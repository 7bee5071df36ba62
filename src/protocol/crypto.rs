// SPDX-License-Identifier: MPL-2.0

//! Direct message encryption (NIP-04 and NIP-44), delegated to nostr-sdk.

use nostr_sdk::nostr::nips::{nip04, nip44};
use nostr_sdk::prelude::{Keys, PublicKey};
use thiserror::Error;

/// Shown in place of a message that cannot be decrypted.
pub const UNDECRYPTABLE_PLACEHOLDER: &str = "[Unable to decrypt message]";

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("invalid peer public key: {0}")]
    InvalidPeer(String),
    #[error("encryption failed: {0}")]
    Encrypt(String),
    #[error("decryption failed: {0}")]
    Decrypt(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DmScheme {
    /// Legacy AES-CBC payloads (`<ciphertext>?iv=<iv>`)
    Nip04,
    #[default]
    Nip44,
}

impl DmScheme {
    /// NIP-04 payloads carry an `?iv=` suffix; anything else is NIP-44.
    pub fn detect(payload: &str) -> Self {
        if payload.contains("?iv=") {
            DmScheme::Nip04
        } else {
            DmScheme::Nip44
        }
    }
}

fn peer_key(peer_hex: &str) -> Result<PublicKey, CryptoError> {
    PublicKey::from_hex(peer_hex).map_err(|e| CryptoError::InvalidPeer(e.to_string()))
}

pub fn encrypt_dm(
    keys: &Keys,
    peer_hex: &str,
    text: &str,
    scheme: DmScheme,
) -> Result<String, CryptoError> {
    let peer = peer_key(peer_hex)?;
    match scheme {
        DmScheme::Nip04 => nip04::encrypt(keys.secret_key(), &peer, text)
            .map_err(|e| CryptoError::Encrypt(e.to_string())),
        DmScheme::Nip44 => nip44::encrypt(keys.secret_key(), &peer, text, nip44::Version::V2)
            .map_err(|e| CryptoError::Encrypt(e.to_string())),
    }
}

pub fn decrypt_dm(keys: &Keys, peer_hex: &str, payload: &str) -> Result<String, CryptoError> {
    let peer = peer_key(peer_hex)?;
    match DmScheme::detect(payload) {
        DmScheme::Nip04 => nip04::decrypt(keys.secret_key(), &peer, payload)
            .map_err(|e| CryptoError::Decrypt(e.to_string())),
        DmScheme::Nip44 => nip44::decrypt(keys.secret_key(), &peer, payload)
            .map_err(|e| CryptoError::Decrypt(e.to_string())),
    }
}

/// Decrypt, degrading to [`UNDECRYPTABLE_PLACEHOLDER`] on any failure.
pub fn decrypt_or_placeholder(keys: &Keys, peer_hex: &str, payload: &str) -> String {
    decrypt_dm(keys, peer_hex, payload).unwrap_or_else(|e| {
        tracing::debug!("DM decryption failed: {}", e);
        UNDECRYPTABLE_PLACEHOLDER.to_string()
    })
}
