//! ML-KEM key generation, encapsulation and decapsulation (component D).
//!
//! Generalizes over both security levels; `Normal` uses ML-KEM-768 and
//! `HighSecurity` uses ML-KEM-1024, matching the table in [`crate::preset`].

use pqcrypto_traits::kem::{
    Ciphertext as _, PublicKey as _, SecretKey as _, SharedSecret as _,
};

use crate::error::{Error, Result};
use crate::preset::Preset;

const OP_ENCAPSULATE: &str = "kem::encapsulate";
const OP_DECAPSULATE: &str = "kem::decapsulate";

/// A raw ML-KEM key pair, byte lengths matching [`Preset::params`].
pub struct GeneratedKeyPair {
    pub public_key: Vec<u8>,
    pub secret_key: Vec<u8>,
}

fn generate_768() -> GeneratedKeyPair {
    let (pk, sk) = pqcrypto_mlkem::mlkem768::keypair();
    GeneratedKeyPair {
        public_key: pk.as_bytes().to_vec(),
        secret_key: sk.as_bytes().to_vec(),
    }
}

fn generate_1024() -> GeneratedKeyPair {
    let (pk, sk) = pqcrypto_mlkem::mlkem1024::keypair();
    GeneratedKeyPair {
        public_key: pk.as_bytes().to_vec(),
        secret_key: sk.as_bytes().to_vec(),
    }
}

/// Generates a fresh key pair for `preset`.
pub fn generate(preset: Preset) -> GeneratedKeyPair {
    match preset {
        Preset::Normal => generate_768(),
        Preset::HighSecurity => generate_1024(),
    }
}

fn validate_lengths(op: &'static str, preset: Preset, name: &str, actual: usize, expected: usize) -> Result<()> {
    if actual == 0 {
        return Err(Error::algorithm_asymmetric(op, preset, format!("{name} is empty")));
    }
    if actual != expected {
        return Err(Error::algorithm_asymmetric(
            op,
            preset,
            format!("{name} has wrong length: {actual}, expected {expected}"),
        ));
    }
    Ok(())
}

/// Encapsulates against `public_key`, returning `(shared_secret, ciphertext)`.
pub fn encapsulate(preset: Preset, public_key: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let params = preset.params();
    validate_lengths(OP_ENCAPSULATE, preset, "public key", public_key.len(), params.kem_pk_len)?;

    match preset {
        Preset::Normal => {
            use pqcrypto_mlkem::mlkem768::PublicKey;
            let pk = PublicKey::from_bytes(public_key)
                .map_err(|_| Error::algorithm_asymmetric(OP_ENCAPSULATE, preset, "malformed public key"))?;
            let (ss, ct) = pqcrypto_mlkem::mlkem768::encapsulate(&pk);
            Ok((ss.as_bytes().to_vec(), ct.as_bytes().to_vec()))
        }
        Preset::HighSecurity => {
            use pqcrypto_mlkem::mlkem1024::PublicKey;
            let pk = PublicKey::from_bytes(public_key)
                .map_err(|_| Error::algorithm_asymmetric(OP_ENCAPSULATE, preset, "malformed public key"))?;
            let (ss, ct) = pqcrypto_mlkem::mlkem1024::encapsulate(&pk);
            Ok((ss.as_bytes().to_vec(), ct.as_bytes().to_vec()))
        }
    }
}

/// Decapsulates `ciphertext` under `secret_key`.
///
/// ML-KEM performs implicit rejection: a malformed or wrong-key ciphertext
/// does not fail here, it yields a pseudorandom shared secret. Callers must
/// rely on the downstream AEAD authentication tag, never on this returning
/// an error, to detect a wrong key.
pub fn decapsulate(preset: Preset, ciphertext: &[u8], secret_key: &[u8]) -> Result<Vec<u8>> {
    let params = preset.params();
    validate_lengths(OP_DECAPSULATE, preset, "secret key", secret_key.len(), params.kem_sk_len)?;
    validate_lengths(OP_DECAPSULATE, preset, "ciphertext", ciphertext.len(), params.kem_ct_len)?;

    match preset {
        Preset::Normal => {
            use pqcrypto_mlkem::mlkem768::{Ciphertext, SecretKey};
            let sk = SecretKey::from_bytes(secret_key)
                .map_err(|_| Error::algorithm_asymmetric(OP_DECAPSULATE, preset, "malformed secret key"))?;
            let ct = Ciphertext::from_bytes(ciphertext)
                .map_err(|_| Error::algorithm_asymmetric(OP_DECAPSULATE, preset, "malformed ciphertext"))?;
            let ss = pqcrypto_mlkem::mlkem768::decapsulate(&ct, &sk);
            Ok(ss.as_bytes().to_vec())
        }
        Preset::HighSecurity => {
            use pqcrypto_mlkem::mlkem1024::{Ciphertext, SecretKey};
            let sk = SecretKey::from_bytes(secret_key)
                .map_err(|_| Error::algorithm_asymmetric(OP_DECAPSULATE, preset, "malformed secret key"))?;
            let ct = Ciphertext::from_bytes(ciphertext)
                .map_err(|_| Error::algorithm_asymmetric(OP_DECAPSULATE, preset, "malformed ciphertext"))?;
            let ss = pqcrypto_mlkem::mlkem1024::decapsulate(&ct, &sk);
            Ok(ss.as_bytes().to_vec())
        }
    }
}
