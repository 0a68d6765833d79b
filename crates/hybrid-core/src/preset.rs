//! Algorithm parameter table. Every other component reads its constants from
//! here rather than hardcoding a KEM variant, key length, or hash choice.

use serde::{Deserialize, Serialize};

/// Drives every algorithm parameter in the crate from a single choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    Normal,
    HighSecurity,
}

impl Default for Preset {
    fn default() -> Self {
        Preset::Normal
    }
}

/// HKDF hash selection, parameterizing [`crate::kdf`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfHash {
    Sha256,
    Sha512,
}

/// The fixed parameter bundle for a [`Preset`] (spec §3 table).
#[derive(Debug, Clone, Copy)]
pub struct Params {
    pub preset: Preset,
    pub kem_pk_len: usize,
    pub kem_sk_len: usize,
    pub kem_ct_len: usize,
    pub shared_secret_len: usize,
    pub aead_key_bits: usize,
    pub nonce_bytes: usize,
    pub hash: KdfHash,
    /// Output length of the deterministic-salt HKDF step (§4.C step 2).
    pub salt_len: usize,
}

impl Preset {
    pub const fn params(self) -> Params {
        match self {
            Preset::Normal => Params {
                preset: Preset::Normal,
                kem_pk_len: 1184,
                kem_sk_len: 2400,
                kem_ct_len: 1088,
                shared_secret_len: 32,
                aead_key_bits: 256,
                nonce_bytes: 12,
                hash: KdfHash::Sha256,
                salt_len: 32,
            },
            Preset::HighSecurity => Params {
                preset: Preset::HighSecurity,
                kem_pk_len: 1568,
                kem_sk_len: 3168,
                kem_ct_len: 1568,
                shared_secret_len: 32,
                aead_key_bits: 256,
                nonce_bytes: 16,
                hash: KdfHash::Sha512,
                salt_len: 64,
            },
        }
    }

    pub const fn wire_str(self) -> &'static str {
        match self {
            Preset::Normal => "normal",
            Preset::HighSecurity => "high-security",
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_str())
    }
}
