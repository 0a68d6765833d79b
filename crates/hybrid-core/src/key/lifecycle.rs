//! Generate, validate, expiry-check, and zeroize key pairs (component I).

use chrono::{DateTime, Months, Utc};

use crate::config::KeyManagerConfig;
use crate::error::{Error, Result};
use crate::kem;
use crate::key::keypair::{KeyMetadata, KeyPair};
use crate::preset::Preset;

const OP_VALIDATE: &str = "lifecycle::validate";

/// Generates a fresh key pair. `version` is assigned by the caller (the key
/// store knows the next version number).
pub fn generate(config: &KeyManagerConfig, version: u32) -> KeyPair {
    let generated = kem::generate(config.preset);
    let created_at = Utc::now();
    let expires_at = add_months(created_at, config.key_expiry_months);
    KeyPair::new(
        generated.public_key,
        generated.secret_key,
        KeyMetadata {
            preset: config.preset,
            version,
            created_at,
            expires_at,
        },
    )
}

fn add_months(from: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    from.checked_add_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub fn is_expired(keys: &KeyPair, now: DateTime<Utc>) -> bool {
    now >= keys.metadata.expires_at
}

/// Per-field validation result, useful for observability beyond a bare bool.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub ok: bool,
    pub errors: Vec<String>,
}

/// Checks key lengths for `preset` and, optionally, round-trips an
/// encapsulate/decapsulate to confirm the pair actually agrees.
pub fn validate(keys: &KeyPair) -> ValidationReport {
    let mut errors = Vec::new();
    let params = keys.preset().params();

    if keys.public_key.is_empty() {
        errors.push("public key is empty".to_string());
    } else if keys.public_key.len() != params.kem_pk_len {
        errors.push(format!(
            "public key length {} does not match preset (expected {})",
            keys.public_key.len(),
            params.kem_pk_len
        ));
    }

    if keys.secret_key().is_empty() {
        errors.push("secret key is empty".to_string());
    } else if keys.secret_key().len() != params.kem_sk_len {
        errors.push(format!(
            "secret key length {} does not match preset (expected {})",
            keys.secret_key().len(),
            params.kem_sk_len
        ));
    }

    if errors.is_empty() {
        match round_trip_check(keys) {
            Ok(true) => {}
            Ok(false) => errors.push("encapsulate/decapsulate round trip disagreed".to_string()),
            Err(e) => errors.push(format!("round trip check failed: {e}")),
        }
    }

    ValidationReport {
        ok: errors.is_empty(),
        errors,
    }
}

fn round_trip_check(keys: &KeyPair) -> Result<bool> {
    let (shared_secret, ciphertext) = kem::encapsulate(keys.preset(), &keys.public_key)
        .map_err(|e| Error::algorithm_asymmetric(OP_VALIDATE, keys.preset(), e.to_string()))?;
    let recovered = kem::decapsulate(keys.preset(), &ciphertext, keys.secret_key())?;
    Ok(shared_secret == recovered)
}

/// Overwrites a key pair's byte buffers with zero before it is released.
/// `KeyPair`'s secret half already zeroizes on drop; this additionally
/// zeroizes the public half, which carries no such guarantee by itself.
pub fn zeroize(keys: &mut KeyPair) {
    keys.public_key.iter_mut().for_each(|b| *b = 0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn generate_sets_expiry_one_month_out() {
        let config = KeyManagerConfig::default();
        let kp = generate(&config, 1);
        assert!(kp.metadata.expires_at > kp.metadata.created_at);
    }

    #[test]
    fn fresh_key_is_not_expired() {
        let config = KeyManagerConfig::default();
        let kp = generate(&config, 1);
        assert!(!is_expired(&kp, Utc::now()));
    }

    #[test]
    fn expiry_check_respects_supplied_now() {
        let config = KeyManagerConfig::default();
        let kp = generate(&config, 1);
        let far_future = kp.metadata.expires_at + Duration::days(1);
        assert!(is_expired(&kp, far_future));
    }

    #[test]
    fn validate_accepts_freshly_generated_keys() {
        let config = KeyManagerConfig::default();
        let kp = generate(&config, 1);
        let report = validate(&kp);
        assert!(report.ok, "errors: {:?}", report.errors);
    }

    #[test]
    fn validate_rejects_wrong_length_keys() {
        let config = KeyManagerConfig::default();
        let mut kp = generate(&config, 1);
        kp.public_key.truncate(10);
        let report = validate(&kp);
        assert!(!report.ok);
    }

    #[test]
    fn zeroize_clears_public_key_bytes() {
        let config = KeyManagerConfig::default();
        let mut kp = generate(&config, 1);
        zeroize(&mut kp);
        assert!(kp.public_key.iter().all(|b| *b == 0));
    }
}
