//! End-to-end round trip through the key manager and hybrid engine together
//! (spec §8 seed scenario 1).

use std::collections::BTreeMap;

use hybrid_core::config::KeyManagerConfig;
use hybrid_core::engine;
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
async fn round_trip_small_object() {
    let dir = tempfile::tempdir().unwrap();
    let manager = KeyManager::new(config_in(dir.path()));
    manager.initialize().await.unwrap();

    let mut map = BTreeMap::new();
    map.insert("message".to_string(), Value::String("Hello, secure world!".into()));
    let payload = Value::Mapping(map);

    let public_key = manager.current_public_key().await.unwrap();
    let envelope = engine::encrypt(&payload, &public_key, Preset::Normal).unwrap();

    let secret_key = manager.current_secret_key().await.unwrap();
    let decrypted = engine::decrypt(&envelope, &secret_key).unwrap();
    assert_eq!(decrypted, payload);
}

#[tokio::test]
async fn round_trip_high_security_preset() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.preset = Preset::HighSecurity;
    let manager = KeyManager::new(config);
    manager.initialize().await.unwrap();

    let public_key = manager.current_public_key().await.unwrap();
    let envelope =
        engine::encrypt(&Value::String("high security payload".into()), &public_key, Preset::HighSecurity)
            .unwrap();

    let secret_key = manager.current_secret_key().await.unwrap();
    let decrypted = engine::decrypt(&envelope, &secret_key).unwrap();
    assert_eq!(decrypted, Value::String("high security payload".into()));
}

#[tokio::test]
async fn null_payload_round_trips_through_the_manager() {
    let dir = tempfile::tempdir().unwrap();
    let manager = KeyManager::new(config_in(dir.path()));
    manager.initialize().await.unwrap();

    let public_key = manager.current_public_key().await.unwrap();
    let envelope = engine::encrypt(&Value::Null, &public_key, Preset::Normal).unwrap();
    let secret_key = manager.current_secret_key().await.unwrap();
    assert_eq!(engine::decrypt(&envelope, &secret_key).unwrap(), Value::Null);
}
