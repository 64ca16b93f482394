//! API key repository: issuance, rotation, and hash lookup.
//!
//! One key per ledger. Keys are random 32-byte values, base64url-encoded
//! with a `qk_` prefix. Only the SHA-256 hex of the plaintext touches the
//! database; rotation replaces the hash in place, invalidating the old key
//! in the same statement that issues the new one.

use chrono::Utc;
use rand::RngCore;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::entities::{api_keys, ledgers};

/// A freshly issued key. The plaintext exists only in this value.
#[derive(Debug)]
pub struct IssuedKey {
    /// The stored row.
    pub key: api_keys::Model,
    /// Shown to the caller once, never persisted.
    pub plaintext: String,
}

/// API key repository.
#[derive(Debug, Clone)]
pub struct ApiKeyRepository {
    db: DatabaseConnection,
}

impl ApiKeyRepository {
    /// Creates a new API key repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Rotates the key for a ledger. The old plaintext stops working the
    /// moment the new hash is stored.
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` if the ledger has no key to rotate.
    pub async fn rotate(&self, ledger_id: Uuid) -> Result<IssuedKey, DbErr> {
        let existing = api_keys::Entity::find()
            .filter(api_keys::Column::LedgerId.eq(ledger_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("api key for ledger {ledger_id}")))?;

        let (plaintext, key_hash) = generate_key();
        let now = Utc::now();

        let mut active: api_keys::ActiveModel = existing.into();
        active.key_hash = Set(key_hash);
        active.rotated_at = Set(Some(now.into()));
        let key = active.update(&self.db).await?;

        tracing::info!(ledger_id = %ledger_id, "api key rotated");

        Ok(IssuedKey { key, plaintext })
    }

    /// Resolves a plaintext key to its ledger, or `None` for an unknown key.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    pub async fn authenticate(&self, plaintext: &str) -> Result<Option<ledgers::Model>, DbErr> {
        let key_hash = hash_key(plaintext);

        let Some(key) = api_keys::Entity::find()
            .filter(api_keys::Column::KeyHash.eq(key_hash))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        ledgers::Entity::find_by_id(key.ledger_id).one(&self.db).await
    }
}

/// SHA-256 hex of a plaintext key.
#[must_use]
pub fn hash_key(plaintext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plaintext.as_bytes());
    hex::encode(hasher.finalize())
}

fn generate_key() -> (String, String) {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    let plaintext = format!("qk_{}", base64_url::encode(&bytes));
    let key_hash = hash_key(&plaintext);
    (plaintext, key_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_keys_are_distinct() {
        let (a, _) = generate_key();
        let (b, _) = generate_key();
        assert_ne!(a, b);
        assert!(a.starts_with("qk_"));
    }

    #[test]
    fn test_hash_is_hex_sha256_of_plaintext() {
        let (plaintext, key_hash) = generate_key();
        assert_eq!(key_hash.len(), 64);
        assert_eq!(key_hash, hash_key(&plaintext));
    }
}
