//! Key pair data model: public/secret key bytes plus metadata (spec §3).

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, Secret};
use zeroize::Zeroize;

use crate::preset::Preset;

/// Metadata alongside a key pair's raw bytes.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct KeyMetadata {
    pub preset: Preset,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A key pair: `public_key` is plain bytes, `secret_key` is zeroized on
/// drop. Immutable once constructed; retirement zeroizes and discards it.
#[derive(Clone)]
pub struct KeyPair {
    pub public_key: Vec<u8>,
    secret_key: Secret<SecretKeyBytes>,
    pub metadata: KeyMetadata,
}

#[derive(Clone, Zeroize)]
#[zeroize(drop)]
struct SecretKeyBytes(Vec<u8>);

impl secrecy::CloneableSecret for SecretKeyBytes {}
impl secrecy::DebugSecret for SecretKeyBytes {}

impl KeyPair {
    pub fn new(public_key: Vec<u8>, secret_key: Vec<u8>, metadata: KeyMetadata) -> Self {
        KeyPair {
            public_key,
            secret_key: Secret::new(SecretKeyBytes(secret_key)),
            metadata,
        }
    }

    pub fn secret_key(&self) -> &[u8] {
        &self.secret_key.expose_secret().0
    }

    pub fn preset(&self) -> Preset {
        self.metadata.preset
    }

    pub fn version(&self) -> u32 {
        self.metadata.version
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key_len", &self.public_key.len())
            .field("secret_key", &"<redacted>")
            .field("metadata", &self.metadata)
            .finish()
    }
}
