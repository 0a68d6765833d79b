//! Standalone KAT-style checker: given a JSON fixture of a shared secret and
//! the expected derived key material, recomputes the HKDF salt-derivation
//! and key-expansion steps independently of `hybrid_core::kdf` and reports
//! any mismatch. Grounded on the teacher's own `verify-kat` binary, which
//! checks derived key vectors the same way before trusting a release.

use aead::{Aead, KeyInit, Payload};
use aes_gcm::Aes256Gcm;
use anyhow::{bail, Context, Result};
use hkdf::Hkdf;
use serde::Deserialize;
use sha2::Sha256;

#[derive(Deserialize)]
struct Fixture {
    kdf: KdfVector,
    aead: AeadVector,
}

#[derive(Deserialize)]
struct KdfVector {
    shared_secret_hex: String,
    expected_salt_hex: String,
    expected_key_hex: String,
}

#[derive(Deserialize)]
struct AeadVector {
    key_hex: String,
    nonce_hex: String,
    plaintext_hex: String,
    expected_ciphertext_hex: String,
}

const SALT_INFO: &[u8] = b"HKDF-SALT-DERIVATION";
const KEY_INFO: &[u8] = b"HybridEncryption-v2.0";

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .context("usage: verify-vectors <fixture.json>")?;
    let bytes = std::fs::read(&path).with_context(|| format!("reading {path}"))?;
    let fixture: Fixture = serde_json::from_slice(&bytes).context("parsing fixture")?;

    verify_kdf(&fixture.kdf)?;
    verify_aead(&fixture.aead)?;

    println!("all vectors verified");
    Ok(())
}

fn verify_kdf(vector: &KdfVector) -> Result<()> {
    let shared_secret = hex::decode(&vector.shared_secret_hex).context("decoding shared_secret_hex")?;
    let expected_salt = hex::decode(&vector.expected_salt_hex).context("decoding expected_salt_hex")?;
    let expected_key = hex::decode(&vector.expected_key_hex).context("decoding expected_key_hex")?;

    let mut salt = vec![0u8; expected_salt.len()];
    Hkdf::<Sha256>::new(Some(&[]), &shared_secret)
        .expand(SALT_INFO, &mut salt)
        .map_err(|e| anyhow::anyhow!("salt expand failed: {e}"))?;
    if salt != expected_salt {
        bail!(
            "salt mismatch: got {}, expected {}",
            hex::encode(&salt),
            vector.expected_salt_hex
        );
    }

    let mut key = vec![0u8; expected_key.len()];
    Hkdf::<Sha256>::new(Some(&salt), &shared_secret)
        .expand(KEY_INFO, &mut key)
        .map_err(|e| anyhow::anyhow!("key expand failed: {e}"))?;
    if key != expected_key {
        bail!(
            "key mismatch: got {}, expected {}",
            hex::encode(&key),
            vector.expected_key_hex
        );
    }

    println!("kdf vector ok");
    Ok(())
}

fn verify_aead(vector: &AeadVector) -> Result<()> {
    let key = hex::decode(&vector.key_hex).context("decoding key_hex")?;
    let nonce = hex::decode(&vector.nonce_hex).context("decoding nonce_hex")?;
    let plaintext = hex::decode(&vector.plaintext_hex).context("decoding plaintext_hex")?;
    let expected = hex::decode(&vector.expected_ciphertext_hex).context("decoding expected_ciphertext_hex")?;

    let cipher = Aes256Gcm::new_from_slice(&key).context("building cipher")?;
    let nonce = aead::generic_array::GenericArray::from_slice(&nonce);
    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: &plaintext, aad: b"" })
        .map_err(|e| anyhow::anyhow!("encrypt failed: {e}"))?;

    if ciphertext != expected {
        bail!(
            "ciphertext mismatch: got {}, expected {}",
            hex::encode(&ciphertext),
            vector.expected_ciphertext_hex
        );
    }

    println!("aead vector ok");
    Ok(())
}
