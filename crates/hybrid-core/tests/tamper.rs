//! Authentication-failure and validation-before-crypto scenarios (spec §8
//! seed scenarios 3 and 4).

use hybrid_core::config::KeyManagerConfig;
use hybrid_core::engine;
use hybrid_core::error::Error;
use hybrid_core::key::KeyManager;
use hybrid_core::serializer::Value;
use hybrid_core::Preset;

fn config_in(dir: &std::path::Path) -> KeyManagerConfig {
    KeyManagerConfig {
        cert_path: dir.to_path_buf(),
        ..KeyManagerConfig::default()
    }
}

#[tokio::test]
async fn tampered_ciphertext_fails_authentication() {
    let dir = tempfile::tempdir().unwrap();
    let manager = KeyManager::new(config_in(dir.path()));
    manager.initialize().await.unwrap();

    let public_key = manager.current_public_key().await.unwrap();
    let mut envelope = engine::encrypt(&Value::String("secret".into()), &public_key, Preset::Normal).unwrap();

    let mut bytes = hybrid_core::codec::decode_base64(&envelope.encrypted_content).unwrap();
    bytes[0] ^= 0x01;
    envelope.encrypted_content = hybrid_core::codec::encode_base64(&bytes);

    let secret_key = manager.current_secret_key().await.unwrap();
    let err = engine::decrypt(&envelope, &secret_key).unwrap_err();
    assert!(matches!(err, Error::AeadAuthFailure { .. }));
}

#[tokio::test]
async fn wrong_key_pair_fails_authentication() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let manager_a = KeyManager::new(config_in(dir_a.path()));
    let manager_b = KeyManager::new(config_in(dir_b.path()));
    manager_a.initialize().await.unwrap();
    manager_b.initialize().await.unwrap();

    let public_key_a = manager_a.current_public_key().await.unwrap();
    let envelope = engine::encrypt(&Value::String("secret".into()), &public_key_a, Preset::Normal).unwrap();

    let secret_key_b = manager_b.current_secret_key().await.unwrap();
    let err = engine::decrypt(&envelope, &secret_key_b).unwrap_err();
    assert!(matches!(err, Error::AeadAuthFailure { .. }));
}

#[tokio::test]
async fn preset_mismatch_on_key_size_is_rejected_before_crypto() {
    let dir = tempfile::tempdir().unwrap();
    let manager = KeyManager::new(config_in(dir.path()));
    manager.initialize().await.unwrap();

    let public_key = manager.current_public_key().await.unwrap();
    let mut envelope = engine::encrypt(&Value::String("secret".into()), &public_key, Preset::Normal).unwrap();
    let high_security_ct_len = Preset::HighSecurity.params().kem_ct_len;
    envelope.cipher_text = hybrid_core::codec::encode_base64(&vec![0u8; high_security_ct_len]);

    let secret_key = manager.current_secret_key().await.unwrap();
    let err = engine::decrypt(&envelope, &secret_key).unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
}

#[tokio::test]
async fn repeated_encryption_of_same_payload_yields_fresh_nonces() {
    let dir = tempfile::tempdir().unwrap();
    let manager = KeyManager::new(config_in(dir.path()));
    manager.initialize().await.unwrap();

    let public_key = manager.current_public_key().await.unwrap();
    let payload = Value::String("same payload every time".into());
    let e1 = engine::encrypt(&payload, &public_key, Preset::Normal).unwrap();
    let e2 = engine::encrypt(&payload, &public_key, Preset::Normal).unwrap();
    assert_ne!(e1.nonce, e2.nonce);
    assert_ne!(e1.encrypted_content, e2.encrypted_content);
}
