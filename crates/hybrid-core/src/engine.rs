//! Orchestrates the serializer, KDF, KEM and AEAD components into the
//! encrypted-envelope wire format, including grace-period multi-key decrypt
//! (component F).

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{Error, Result};
use crate::kdf;
use crate::kem;
use crate::preset::Preset;
use crate::serializer::{self, Value};

const OP_ENCRYPT: &str = "engine::encrypt";
const OP_DECRYPT: &str = "engine::decrypt";
const OP_GRACE: &str = "engine::decrypt_with_grace";

/// The four-field wire format a client ships to a server (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedEnvelope {
    pub preset: Preset,
    pub cipher_text: String,
    pub nonce: String,
    pub encrypted_content: String,
}

/// Encrypts `payload` under `public_key` for `preset`.
pub fn encrypt(payload: &Value, public_key: &[u8], preset: Preset) -> Result<EncryptedEnvelope> {
    let params = preset.params();
    if public_key.len() != params.kem_pk_len {
        return Err(Error::validation(
            OP_ENCRYPT,
            format!(
                "public key has wrong length: {}, expected {}",
                public_key.len(),
                params.kem_pk_len
            ),
        ));
    }

    let plaintext_bytes = serializer::encode(payload)?;
    let (shared_secret, kem_ct) = kem::encapsulate(preset, public_key)?;
    let key = kdf::derive_key(preset, &shared_secret)?;
    let nonce = codec::secure_random_bytes(params.nonce_bytes);
    let ciphertext = crate::aead::encrypt(preset, &plaintext_bytes, &key, &nonce)?;

    let envelope = EncryptedEnvelope {
        preset,
        cipher_text: codec::encode_base64(&kem_ct),
        nonce: codec::encode_base64(&nonce),
        encrypted_content: codec::encode_base64(&ciphertext),
    };
    validate_envelope_shape(&envelope)?;
    Ok(envelope)
}

/// Decrypts `envelope` under `secret_key`.
pub fn decrypt(envelope: &EncryptedEnvelope, secret_key: &[u8]) -> Result<Value> {
    validate_envelope_shape(envelope)?;
    let params = envelope.preset.params();
    if secret_key.len() != params.kem_sk_len {
        return Err(Error::validation(
            OP_DECRYPT,
            format!(
                "secret key has wrong length: {}, expected {}",
                secret_key.len(),
                params.kem_sk_len
            ),
        ));
    }

    let kem_ct = codec::decode_base64(&envelope.cipher_text)?;
    let nonce = codec::decode_base64(&envelope.nonce)?;
    let ciphertext = codec::decode_base64(&envelope.encrypted_content)?;

    // Decapsulation may yield a pseudorandom value on a wrong key; that is
    // not an error here, the AEAD tag check below is the sole authoritative
    // authentication step.
    let shared_secret = kem::decapsulate(envelope.preset, &kem_ct, secret_key)?;
    let key = kdf::derive_key(envelope.preset, &shared_secret)?;
    let plaintext_bytes = crate::aead::decrypt(envelope.preset, &ciphertext, &key, &nonce)?;
    serializer::decode(&plaintext_bytes)
}

/// Tries `secret_keys` in order (primary first), returning the first
/// successful decrypt. If all fail, surfaces a single
/// `GracePeriodDecryptionFailed` carrying the last cause.
pub fn decrypt_with_grace(envelope: &EncryptedEnvelope, secret_keys: &[&[u8]]) -> Result<Value> {
    let mut last_err: Option<Error> = None;
    for secret_key in secret_keys {
        match decrypt(envelope, secret_key) {
            Ok(value) => return Ok(value),
            Err(e) => last_err = Some(e),
        }
    }
    let cause = last_err.unwrap_or_else(|| Error::validation(OP_GRACE, "no keys provided"));
    Err(Error::GracePeriodDecryptionFailed {
        keys_tried: secret_keys.len(),
        message: format!("all {} key(s) failed to decrypt", secret_keys.len()),
        cause: Box::new(cause),
    })
}

/// Validates envelope field presence, decodability, and preset-matched
/// lengths before any crypto operation runs.
fn validate_envelope_shape(envelope: &EncryptedEnvelope) -> Result<()> {
    if envelope.cipher_text.is_empty() {
        return Err(Error::validation(OP_ENCRYPT, "cipherText is empty"));
    }
    if envelope.nonce.is_empty() {
        return Err(Error::validation(OP_ENCRYPT, "nonce is empty"));
    }
    if envelope.encrypted_content.is_empty() {
        return Err(Error::validation(OP_ENCRYPT, "encryptedContent is empty"));
    }

    let params = envelope.preset.params();
    let kem_ct = codec::decode_base64(&envelope.cipher_text)?;
    if kem_ct.len() != params.kem_ct_len {
        return Err(Error::validation(
            OP_ENCRYPT,
            format!(
                "cipherText length {} does not match preset {} (expected {})",
                kem_ct.len(),
                envelope.preset,
                params.kem_ct_len
            ),
        ));
    }
    let nonce = codec::decode_base64(&envelope.nonce)?;
    if nonce.len() != params.nonce_bytes {
        return Err(Error::validation(
            OP_ENCRYPT,
            format!(
                "nonce length {} does not match preset {} (expected {})",
                nonce.len(),
                envelope.preset,
                params.nonce_bytes
            ),
        ));
    }
    Ok(())
}
