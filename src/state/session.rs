// SPDX-License-Identifier: MPL-2.0

use crate::config::APP_ID;
use crate::protocol::keys;
use nostr_sdk::prelude::Keys;
use secret_service::{Collection, EncryptionType, SecretService};
use thiserror::Error;

const SECRET_LABEL: &str = "NostrFeed Signing Key";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("secret service unavailable: {0}")]
    SecretService(String),
    #[error("no stored key")]
    NotFound,
    #[error("invalid stored key: {0}")]
    InvalidData(String),
}

fn service_err(e: secret_service::Error) -> SessionError {
    SessionError::SecretService(e.to_string())
}

/// Default collection, unlocked.
async fn unlocked_collection<'a>(
    ss: &'a SecretService<'_>,
) -> Result<Collection<'a>, SessionError> {
    let collection = ss.get_default_collection().await.map_err(service_err)?;
    if collection.is_locked().await.unwrap_or(true) {
        collection.unlock().await.map_err(service_err)?;
    }
    Ok(collection)
}

/// Parse a stored secret back into keys.
fn keys_from_secret(secret: &[u8]) -> Result<Keys, SessionError> {
    let text =
        std::str::from_utf8(secret).map_err(|e| SessionError::InvalidData(e.to_string()))?;
    keys::parse_secret(text.trim()).map_err(|e| SessionError::InvalidData(e.to_string()))
}

/// Keeps the user's nsec in the desktop keyring via libsecret.
pub struct KeyStore;

impl KeyStore {
    pub async fn store(keys: &Keys) -> Result<(), SessionError> {
        let nsec = keys::nsec(keys).map_err(|e| SessionError::InvalidData(e.to_string()))?;
        let pubkey = keys.public_key().to_hex();

        let ss = SecretService::connect(EncryptionType::Dh)
            .await
            .map_err(service_err)?;
        let collection = unlocked_collection(&ss).await?;

        let attributes = vec![("application", APP_ID), ("pubkey", pubkey.as_str())];
        collection
            .create_item(
                SECRET_LABEL,
                attributes.into_iter().collect(),
                nsec.as_bytes(),
                true, // replace existing
                "text/plain",
            )
            .await
            .map_err(service_err)?;

        tracing::info!("stored signing key for {}", keys::short_npub(&pubkey));
        Ok(())
    }

    pub async fn load() -> Result<Keys, SessionError> {
        let ss = SecretService::connect(EncryptionType::Dh)
            .await
            .map_err(service_err)?;
        let collection = unlocked_collection(&ss).await?;

        let attributes = vec![("application", APP_ID)];
        let items = collection
            .search_items(attributes.into_iter().collect())
            .await
            .map_err(service_err)?;

        let item = items.first().ok_or(SessionError::NotFound)?;
        let secret = item.get_secret().await.map_err(service_err)?;
        keys_from_secret(&secret)
    }

    pub async fn clear() -> Result<(), SessionError> {
        let ss = SecretService::connect(EncryptionType::Dh)
            .await
            .map_err(service_err)?;
        let collection = unlocked_collection(&ss).await?;

        let attributes = vec![("application", APP_ID)];
        let items = collection
            .search_items(attributes.into_iter().collect())
            .await
            .map_err(service_err)?;

        for item in items {
            item.delete().await.map_err(service_err)?;
        }

        tracing::info!("cleared stored signing key");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_from_secret() {
        let original = Keys::generate();
        let nsec = keys::nsec(&original).unwrap();

        let restored = keys_from_secret(format!("{}\n", nsec).as_bytes()).unwrap();
        assert_eq!(restored.public_key(), original.public_key());
    }

    #[test]
    fn test_garbage_secret() {
        assert!(matches!(
            keys_from_secret(b"not a key"),
            Err(SessionError::InvalidData(_))
        ));
        assert!(matches!(
            keys_from_secret(&[0xff, 0xfe]),
            Err(SessionError::InvalidData(_))
        ));
    }
}
