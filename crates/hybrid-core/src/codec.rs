//! UTF-8, Base64, constant-time compare, and secure random bytes (component A).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::error::{Error, Result};

const OP_DECODE: &str = "codec::decode_base64";
const OP_UTF8_DECODE: &str = "codec::utf8_decode";

/// Encodes `bytes` as standard Base64 (with padding). `&[]` encodes to `""`.
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes standard Base64 with the strict `[A-Za-z0-9+/]` alphabet and
/// `={0,2}` padding. `""` decodes to `[]`.
pub fn decode_base64(s: &str) -> Result<Vec<u8>> {
    if s.is_empty() {
        return Ok(Vec::new());
    }
    STANDARD
        .decode(s)
        .map_err(|e| Error::format(OP_DECODE, format!("invalid base64: {e}")))
}

pub fn utf8_encode(s: &str) -> Vec<u8> {
    s.as_bytes().to_vec()
}

pub fn utf8_decode(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| Error::format(OP_UTF8_DECODE, format!("invalid utf-8: {e}")))
}

/// Fills an `n`-byte buffer from the process's secure RNG.
pub fn secure_random_bytes(n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    buf
}

/// Constant-time equality, independent of `a`/`b` contents (but not length —
/// unequal lengths short-circuit, which is not itself secret-dependent).
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_empty_round_trips() {
        assert_eq!(encode_base64(&[]), "");
        assert_eq!(decode_base64("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn base64_round_trips() {
        let data = b"the quick brown fox";
        let encoded = encode_base64(data);
        assert_eq!(decode_base64(&encoded).unwrap(), data);
    }

    #[test]
    fn base64_rejects_invalid_alphabet() {
        assert!(decode_base64("not valid base64!!").is_err());
    }

    #[test]
    fn utf8_round_trips() {
        let s = "hybrid encryption \u{1F512}";
        let bytes = utf8_encode(s);
        assert_eq!(utf8_decode(&bytes).unwrap(), s);
    }

    #[test]
    fn utf8_decode_rejects_invalid_sequences() {
        let bad = vec![0xff, 0xfe, 0xfd];
        assert!(utf8_decode(&bad).is_err());
    }

    #[test]
    fn secure_random_bytes_has_requested_length() {
        assert_eq!(secure_random_bytes(32).len(), 32);
        assert_eq!(secure_random_bytes(0).len(), 0);
    }

    #[test]
    fn constant_time_eq_detects_mismatch() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
