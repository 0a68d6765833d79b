//! Hybrid post-quantum encryption core.
//!
//! Combines an ML-KEM key-encapsulation mechanism with AES-256-GCM, keys
//! derived by HKDF from the KEM shared secret, plus a server-side key
//! lifecycle (generation, persistence, versioned rotation with a grace
//! window) and a client-side public-key cache.
//!
//! ```no_run
//! # async fn example() -> hybrid_core::error::Result<()> {
//! use hybrid_core::{config::KeyManagerConfig, key::KeyManager, serializer::Value};
//!
//! let manager = KeyManager::new(KeyManagerConfig::default());
//! manager.initialize().await?;
//!
//! let public_key = manager.current_public_key().await?;
//! let envelope = hybrid_core::engine::encrypt(
//!     &Value::String("hello".into()),
//!     &public_key,
//!     KeyManagerConfig::default().preset,
//! )?;
//!
//! let secret_key = manager.current_secret_key().await?;
//! let payload = hybrid_core::engine::decrypt(&envelope, &secret_key)?;
//! # let _ = payload;
//! # Ok(())
//! # }
//! ```

pub mod aead;
pub mod client;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod kdf;
pub mod kem;
pub mod key;
pub mod preset;
pub mod serializer;

pub use client::ClientKeyCache;
pub use config::KeyManagerConfig;
pub use engine::EncryptedEnvelope;
pub use error::{Error, Result};
pub use key::{KeyManager, KeyPair};
pub use preset::Preset;
pub use serializer::Value;
