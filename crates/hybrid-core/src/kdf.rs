//! HKDF wrapper with preset-selected hash and deterministic salt derivation
//! (component C).

use hkdf::Hkdf;
use sha2::{Sha256, Sha512};

use crate::error::{Error, Result};
use crate::preset::{KdfHash, Preset};

const OP: &str = "kdf::derive_key";
const SALT_INFO: &[u8] = b"HKDF-SALT-DERIVATION";
const KEY_INFO: &[u8] = b"HybridEncryption-v2.0";
const OUTPUT_LEN: usize = 32;

/// Derives the 32-byte AEAD key from a KEM shared secret.
///
/// 1. Validates `|shared_secret| >= 16`.
/// 2. Derives a deterministic salt from the shared secret itself so decrypt
///    can reproduce it without transmitting anything extra.
/// 3. Expands the final key under a fixed info string.
///
/// Info strings are constants; never vary them per message.
pub fn derive_key(preset: Preset, shared_secret: &[u8]) -> Result<[u8; OUTPUT_LEN]> {
    if shared_secret.len() < 16 {
        return Err(Error::AlgorithmKdf {
            operation: OP,
            message: format!(
                "shared secret too short: {} bytes, need at least 16",
                shared_secret.len()
            ),
        });
    }

    let params = preset.params();
    let salt = derive_salt(params.hash, shared_secret, params.salt_len)?;

    let mut okm = [0u8; OUTPUT_LEN];
    expand(params.hash, shared_secret, &salt, KEY_INFO, &mut okm)?;
    Ok(okm)
}

fn derive_salt(hash: KdfHash, shared_secret: &[u8], salt_len: usize) -> Result<Vec<u8>> {
    let mut salt = vec![0u8; salt_len];
    expand(hash, shared_secret, &[], SALT_INFO, &mut salt)?;
    Ok(salt)
}

fn expand(hash: KdfHash, ikm: &[u8], salt: &[u8], info: &[u8], okm: &mut [u8]) -> Result<()> {
    match hash {
        KdfHash::Sha256 => {
            let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
            hk.expand(info, okm)
                .map_err(|e| Error::AlgorithmKdf {
                    operation: OP,
                    message: format!("hkdf expand failed: {e}"),
                })
        }
        KdfHash::Sha512 => {
            let hk = Hkdf::<Sha512>::new(Some(salt), ikm);
            hk.expand(info, okm)
                .map_err(|e| Error::AlgorithmKdf {
                    operation: OP,
                    message: format!("hkdf expand failed: {e}"),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_key_is_deterministic() {
        let ss = [7u8; 32];
        let k1 = derive_key(Preset::Normal, &ss).unwrap();
        let k2 = derive_key(Preset::Normal, &ss).unwrap();
        assert_eq!(k1, k2);
    }

    #[test]
    fn derive_key_differs_per_preset() {
        let ss = [7u8; 32];
        let normal = derive_key(Preset::Normal, &ss).unwrap();
        let high = derive_key(Preset::HighSecurity, &ss).unwrap();
        assert_ne!(normal, high);
    }

    #[test]
    fn derive_key_rejects_short_secret() {
        let err = derive_key(Preset::Normal, &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, Error::AlgorithmKdf { .. }));
    }

    #[test]
    fn derive_key_differs_per_secret() {
        let a = derive_key(Preset::Normal, &[1u8; 32]).unwrap();
        let b = derive_key(Preset::Normal, &[2u8; 32]).unwrap();
        assert_ne!(a, b);
    }
}
