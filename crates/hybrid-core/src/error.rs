use crate::preset::Preset;

/// The complete error taxonomy surfaced by this crate.
///
/// Every variant carries the operation that failed and, where relevant, the
/// preset in play. None of these ever carry key material or plaintext.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("validation failed in {operation}: {message}")]
    Validation {
        operation: &'static str,
        message: String,
    },

    #[error("format error in {operation}: {message}")]
    Format {
        operation: &'static str,
        message: String,
    },

    #[error("asymmetric algorithm error in {operation} (preset {preset:?}): {message}")]
    AlgorithmAsymmetric {
        operation: &'static str,
        preset: Preset,
        message: String,
    },

    #[error("symmetric algorithm error in {operation} (preset {preset:?}): {message}")]
    AlgorithmSymmetric {
        operation: &'static str,
        preset: Preset,
        message: String,
    },

    #[error("AEAD authentication failed in {operation}")]
    AeadAuthFailure { operation: &'static str },

    #[error("key derivation error in {operation}: {message}")]
    AlgorithmKdf {
        operation: &'static str,
        message: String,
    },

    #[error("key manager initialization failed: {message}")]
    KeyManagerInitialization { message: String },

    #[error("key manager rotation failed: {message}")]
    KeyManagerRotation { message: String },

    #[error("key manager storage error in {operation}: {message}")]
    KeyManagerStorage {
        operation: &'static str,
        #[source]
        cause: Option<std::io::Error>,
        message: String,
    },

    #[error("key manager retrieval failed: {message}")]
    KeyManagerRetrieval { message: String },

    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("grace-period decryption failed after trying {keys_tried} key(s): {message}")]
    GracePeriodDecryptionFailed {
        keys_tried: usize,
        message: String,
        #[source]
        cause: Box<Error>,
    },

    #[error("public key fetch failed for {url}: {message}")]
    PublicKeyFetch { url: String, message: String },
}

impl Error {
    pub fn validation(operation: &'static str, message: impl Into<String>) -> Self {
        Error::Validation {
            operation,
            message: message.into(),
        }
    }

    pub fn format(operation: &'static str, message: impl Into<String>) -> Self {
        Error::Format {
            operation,
            message: message.into(),
        }
    }

    pub fn algorithm_asymmetric(
        operation: &'static str,
        preset: Preset,
        message: impl Into<String>,
    ) -> Self {
        Error::AlgorithmAsymmetric {
            operation,
            preset,
            message: message.into(),
        }
    }

    pub fn algorithm_symmetric(
        operation: &'static str,
        preset: Preset,
        message: impl Into<String>,
    ) -> Self {
        Error::AlgorithmSymmetric {
            operation,
            preset,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
