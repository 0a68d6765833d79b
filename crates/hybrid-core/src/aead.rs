//! AES-256-GCM encrypt/decrypt with validated key/nonce sizes (component E).

use aead::generic_array::typenum::{U12, U16};
use aead::{Aead, KeyInit, Payload};
use aes_gcm::{AesGcm, Aes256Gcm};
use aes_gcm::aes::Aes256;

use crate::error::{Error, Result};
use crate::preset::Preset;

const OP_ENCRYPT: &str = "aead::encrypt";
const OP_DECRYPT: &str = "aead::decrypt";
const KEY_LEN: usize = 32;
const TAG_LEN: usize = 16;

/// AES-256-GCM with a 16-byte nonce, used by the `HighSecurity` preset.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

fn validate_sizes(op: &'static str, preset: Preset, key: &[u8], nonce: &[u8]) -> Result<()> {
    if key.len() != KEY_LEN {
        return Err(Error::algorithm_symmetric(
            op,
            preset,
            format!("key has wrong length: {}, expected {}", key.len(), KEY_LEN),
        ));
    }
    let expected_nonce = preset.params().nonce_bytes;
    if nonce.len() != expected_nonce {
        return Err(Error::algorithm_symmetric(
            op,
            preset,
            format!(
                "nonce has wrong length: {}, expected {}",
                nonce.len(),
                expected_nonce
            ),
        ));
    }
    Ok(())
}

/// Encrypts `plaintext` under `key`/`nonce`. Output is ciphertext||tag
/// (`plaintext.len() + 16` bytes).
pub fn encrypt(preset: Preset, plaintext: &[u8], key: &[u8], nonce: &[u8]) -> Result<Vec<u8>> {
    validate_sizes(OP_ENCRYPT, preset, key, nonce)?;
    let payload = Payload { msg: plaintext, aad: b"" };
    match preset {
        Preset::Normal => {
            let cipher = Aes256Gcm::new_from_slice(key)
                .map_err(|e| Error::algorithm_symmetric(OP_ENCRYPT, preset, format!("bad key: {e}")))?;
            let nonce = aead::generic_array::GenericArray::<u8, U12>::from_slice(nonce);
            cipher
                .encrypt(nonce, payload)
                .map_err(|_| Error::AeadAuthFailure { operation: OP_ENCRYPT })
        }
        Preset::HighSecurity => {
            let cipher = Aes256Gcm16::new_from_slice(key)
                .map_err(|e| Error::algorithm_symmetric(OP_ENCRYPT, preset, format!("bad key: {e}")))?;
            let nonce = aead::generic_array::GenericArray::<u8, U16>::from_slice(nonce);
            cipher
                .encrypt(nonce, payload)
                .map_err(|_| Error::AeadAuthFailure { operation: OP_ENCRYPT })
        }
    }
}

/// Decrypts `ciphertext_with_tag`. Fails with `AeadAuthFailure` on any
/// integrity failure: wrong key, corrupted ciphertext, tampered tag.
pub fn decrypt(preset: Preset, ciphertext_with_tag: &[u8], key: &[u8], nonce: &[u8]) -> Result<Vec<u8>> {
    validate_sizes(OP_DECRYPT, preset, key, nonce)?;
    if ciphertext_with_tag.len() < TAG_LEN {
        return Err(Error::AeadAuthFailure { operation: OP_DECRYPT });
    }
    let payload = Payload { msg: ciphertext_with_tag, aad: b"" };
    match preset {
        Preset::Normal => {
            let cipher = Aes256Gcm::new_from_slice(key)
                .map_err(|e| Error::algorithm_symmetric(OP_DECRYPT, preset, format!("bad key: {e}")))?;
            let nonce = aead::generic_array::GenericArray::<u8, U12>::from_slice(nonce);
            cipher
                .decrypt(nonce, payload)
                .map_err(|_| Error::AeadAuthFailure { operation: OP_DECRYPT })
        }
        Preset::HighSecurity => {
            let cipher = Aes256Gcm16::new_from_slice(key)
                .map_err(|e| Error::algorithm_symmetric(OP_DECRYPT, preset, format!("bad key: {e}")))?;
            let nonce = aead::generic_array::GenericArray::<u8, U16>::from_slice(nonce);
            cipher
                .decrypt(nonce, payload)
                .map_err(|_| Error::AeadAuthFailure { operation: OP_DECRYPT })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_round_trip() {
        let key = [1u8; 32];
        let nonce = [2u8; 12];
        let pt = b"hello hybrid world";
        let ct = encrypt(Preset::Normal, pt, &key, &nonce).unwrap();
        assert_eq!(ct.len(), pt.len() + TAG_LEN);
        let decrypted = decrypt(Preset::Normal, &ct, &key, &nonce).unwrap();
        assert_eq!(decrypted, pt);
    }

    #[test]
    fn tampered_ciphertext_fails_auth() {
        let key = [1u8; 32];
        let nonce = [2u8; 12];
        let mut ct = encrypt(Preset::Normal, b"secret", &key, &nonce).unwrap();
        ct[0] ^= 0x01;
        let err = decrypt(Preset::Normal, &ct, &key, &nonce).unwrap_err();
        assert!(matches!(err, Error::AeadAuthFailure { .. }));
    }

    #[test]
    fn wrong_key_fails_auth() {
        let key_a = [1u8; 32];
        let key_b = [3u8; 32];
        let nonce = [2u8; 12];
        let ct = encrypt(Preset::Normal, b"secret", &key_a, &nonce).unwrap();
        let err = decrypt(Preset::Normal, &ct, &key_b, &nonce).unwrap_err();
        assert!(matches!(err, Error::AeadAuthFailure { .. }));
    }

    #[test]
    fn rejects_wrong_length_key_before_crypto() {
        let nonce = [2u8; 12];
        let err = encrypt(Preset::Normal, b"x", &[0u8; 10], &nonce).unwrap_err();
        assert!(matches!(err, Error::AlgorithmSymmetric { .. }));
    }

    #[test]
    fn rejects_wrong_length_nonce_before_crypto() {
        let key = [1u8; 32];
        let err = encrypt(Preset::Normal, b"x", &key, &[0u8; 5]).unwrap_err();
        assert!(matches!(err, Error::AlgorithmSymmetric { .. }));
    }

    #[test]
    fn high_security_preset_round_trips() {
        let key = [9u8; 32];
        let nonce = [4u8; 16];
        let pt = b"secret payload";
        let ct = encrypt(Preset::HighSecurity, pt, &key, &nonce).unwrap();
        let decrypted = decrypt(Preset::HighSecurity, &ct, &key, &nonce).unwrap();
        assert_eq!(decrypted, pt);
    }

    #[test]
    fn tampered_tag_fails_auth_high_security() {
        let key = [9u8; 32];
        let nonce = [4u8; 16];
        let mut ct = encrypt(Preset::HighSecurity, b"secret payload", &key, &nonce).unwrap();
        let last = ct.len() - 1;
        ct[last] ^= 0x01;
        let err = decrypt(Preset::HighSecurity, &ct, &key, &nonce).unwrap_err();
        assert!(matches!(err, Error::AeadAuthFailure { .. }));
    }
}
