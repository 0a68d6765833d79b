//! Process-wide key orchestrator: load-or-generate, rotation with a grace
//! window, rotation history, and health reporting (component J).
//!
//! Concurrency model (spec §5, single-mutex variant): a `tokio::sync::Mutex`
//! guards all mutable state, and rotation itself is coordinated through a
//! one-shot "gate" — the first caller to register it becomes the sole
//! rotation leader, every other concurrent caller awaits the same
//! `Notify` and returns once the leader is done, so N concurrent
//! `rotate_keys` calls produce exactly one new version.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};

use crate::config::KeyManagerConfig;
use crate::error::{Error, Result};
use crate::key::keypair::KeyPair;
use crate::key::lifecycle;
use crate::key::rotation::{RotationLog, RotationReason};
use crate::key::store::KeyStore;

struct RotationProgress {
    is_rotating: bool,
    started_at: Option<DateTime<Utc>>,
}

struct ManagerState {
    initialized: bool,
    current: Option<KeyPair>,
    previous: Option<KeyPair>,
    grace_until: Option<DateTime<Utc>>,
    rotation: RotationProgress,
}

struct Inner {
    config: KeyManagerConfig,
    store: KeyStore,
    rotation_log: RotationLog,
    state: Mutex<ManagerState>,
    rotation_gate: Mutex<Option<Arc<Notify>>>,
}

/// Process-wide owner of the current (and, during a grace window, previous)
/// key pair. Cheap to clone: internally an `Arc`.
#[derive(Clone)]
pub struct KeyManager {
    inner: Arc<Inner>,
}

#[derive(Debug, Clone)]
pub struct ManagerStatus {
    pub has_keys: bool,
    pub keys_valid: bool,
    pub keys_expired: bool,
    pub is_rotating: bool,
    pub current_version: Option<u32>,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub cert_path: PathBuf,
    pub last_rotation: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct HealthCheck {
    pub healthy: bool,
    pub issues: Vec<String>,
}

impl KeyManager {
    pub fn new(config: KeyManagerConfig) -> Self {
        let rotation_log = RotationLog::new(&config.cert_path);
        let store = KeyStore::new(config.cert_path.clone());
        KeyManager {
            inner: Arc::new(Inner {
                config,
                store,
                rotation_log,
                state: Mutex::new(ManagerState {
                    initialized: false,
                    current: None,
                    previous: None,
                    grace_until: None,
                    rotation: RotationProgress {
                        is_rotating: false,
                        started_at: None,
                    },
                }),
                rotation_gate: Mutex::new(None),
            }),
        }
    }

    /// Idempotent. Validates config, ensures `cert_path` exists, loads or
    /// generates keys, and validates them. Failure leaves the instance
    /// uninitialized so subsequent accesses fail fast.
    pub async fn initialize(&self) -> Result<()> {
        {
            let state = self.inner.state.lock().await;
            if state.initialized {
                return Ok(());
            }
        }

        self.inner
            .config
            .validate()
            .map_err(|e| Error::KeyManagerInitialization {
                message: e.to_string(),
            })?;
        std::fs::create_dir_all(&self.inner.config.cert_path).map_err(|e| {
            Error::KeyManagerInitialization {
                message: format!("cert_path unreachable: {e}"),
            }
        })?;

        let loaded = self
            .inner
            .store
            .load(self.inner.config.key_expiry_months);

        match loaded {
            Some(keys) => {
                let report = lifecycle::validate(&keys);
                if !report.ok {
                    return Err(Error::KeyManagerInitialization {
                        message: format!("loaded keys failed validation: {:?}", report.errors),
                    });
                }
                let mut state = self.inner.state.lock().await;
                if state.initialized {
                    return Ok(());
                }
                state.current = Some(keys);
                state.initialized = true;
                Ok(())
            }
            None => {
                if !self.inner.config.auto_generate {
                    return Err(Error::KeyManagerInitialization {
                        message: "no keys on disk and auto_generate is disabled".into(),
                    });
                }
                self.rotate_keys(RotationReason::InitialGeneration).await?;
                let mut state = self.inner.state.lock().await;
                state.initialized = true;
                Ok(())
            }
        }
    }

    async fn needs_rotation(&self) -> bool {
        let state = self.inner.state.lock().await;
        match &state.current {
            None => true,
            Some(keys) => lifecycle::is_expired(keys, Utc::now()),
        }
    }

    /// Awaits an in-flight rotation if one is running, triggers a new one if
    /// the current key is missing or expired, then returns the current key.
    pub async fn ensure_valid_keys(&self) -> Result<KeyPair> {
        let in_flight = self.inner.rotation_gate.lock().await.clone();
        if let Some(notify) = in_flight {
            notify.notified().await;
        }

        if self.needs_rotation().await {
            self.rotate_keys(RotationReason::ScheduledRotation).await?;
        }

        let state = self.inner.state.lock().await;
        state
            .current
            .clone()
            .ok_or_else(|| Error::KeyManagerRetrieval {
                message: "no keys available after ensure_valid_keys".into(),
            })
    }

    /// Generates, validates, persists, and swaps in a new key pair. If a
    /// rotation is already running, this call instead awaits its completion
    /// and returns without performing a second rotation. If this call became
    /// the rotation leader only after some other caller's rotation already
    /// advanced past the version this call observed on entry, that rotation
    /// satisfies this call too and no second key pair is generated — this is
    /// what makes N concurrent calls to `rotate_keys` produce exactly one new
    /// version, the same guard `ensure_valid_keys` applies via
    /// `needs_rotation()` before calling in here at all.
    pub async fn rotate_keys(&self, reason: RotationReason) -> Result<()> {
        let observed_version = {
            let state = self.inner.state.lock().await;
            state.current.as_ref().map(|k| k.version())
        };

        let existing = {
            let mut gate = self.inner.rotation_gate.lock().await;
            match gate.as_ref() {
                Some(notify) => Some(notify.clone()),
                None => {
                    *gate = Some(Arc::new(Notify::new()));
                    None
                }
            }
        };

        if let Some(existing) = existing {
            existing.notified().await;
            return Ok(());
        }

        let result = self.do_rotate(reason, observed_version).await;

        let waiters = self.inner.rotation_gate.lock().await.take();
        if let Some(waiters) = waiters {
            waiters.notify_waiters();
        }
        result
    }

    async fn do_rotate(&self, reason: RotationReason, observed_version: Option<u32>) -> Result<()> {
        let previous = {
            let state = self.inner.state.lock().await;
            state.current.clone()
        };
        let current_version = previous.as_ref().map(|k| k.version());
        if current_version != observed_version {
            // Someone else rotated between this call observing its starting
            // version and becoming rotation leader; that rotation already
            // satisfies this request.
            return Ok(());
        }

        {
            let mut state = self.inner.state.lock().await;
            state.rotation.is_rotating = true;
            state.rotation.started_at = Some(Utc::now());
        }

        let next_version = self.inner.rotation_log.read().next_version();
        let new_keys = lifecycle::generate(&self.inner.config, next_version);
        let report = lifecycle::validate(&new_keys);
        if !report.ok {
            let mut state = self.inner.state.lock().await;
            state.rotation.is_rotating = false;
            state.rotation.started_at = None;
            return Err(Error::KeyManagerRotation {
                message: format!("generated key pair failed validation: {:?}", report.errors),
            });
        }

        if self.inner.config.enable_file_backup {
            if let Some(prev) = &previous {
                self.inner.store.backup_expired(prev);
            }
        }

        if let Err(e) = self
            .inner
            .store
            .save(&new_keys, self.inner.config.key_expiry_months)
        {
            let mut state = self.inner.state.lock().await;
            state.rotation.is_rotating = false;
            state.rotation.started_at = None;
            return Err(Error::KeyManagerRotation {
                message: format!("failed to persist rotated keys: {e}"),
            });
        }

        let history_reason = if previous.is_some() {
            reason
        } else {
            RotationReason::InitialGeneration
        };
        if let Err(e) = self.inner.rotation_log.append(&new_keys, history_reason) {
            tracing::warn!(error = %e, "rotation history append failed, continuing");
        }

        let grace_minutes = self.inner.config.rotation_grace_period_minutes;
        let grace_until = previous
            .is_some()
            .then(|| Utc::now() + chrono::Duration::minutes(grace_minutes as i64));

        {
            let mut state = self.inner.state.lock().await;
            state.previous = previous;
            state.current = Some(new_keys);
            state.grace_until = grace_until;
            state.rotation.is_rotating = false;
            state.rotation.started_at = None;
        }

        if grace_until.is_some() {
            self.schedule_grace_cleanup(grace_minutes);
        }

        tracing::info!(version_reason = ?history_reason, "key rotation completed");
        Ok(())
    }

    fn schedule_grace_cleanup(&self, grace_minutes: u32) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(u64::from(grace_minutes) * 60)).await;
            let mut state = inner.state.lock().await;
            if let Some(deadline) = state.grace_until {
                if Utc::now() >= deadline {
                    if let Some(mut previous) = state.previous.take() {
                        lifecycle::zeroize(&mut previous);
                    }
                    state.grace_until = None;
                }
            }
        });
    }

    pub async fn current_public_key(&self) -> Result<Vec<u8>> {
        Ok(self.ensure_valid_keys().await?.public_key)
    }

    pub async fn current_public_key_base64(&self) -> Result<String> {
        Ok(crate::codec::encode_base64(&self.current_public_key().await?))
    }

    pub async fn current_secret_key(&self) -> Result<Vec<u8>> {
        Ok(self.ensure_valid_keys().await?.secret_key().to_vec())
    }

    /// `[current]`, plus `previous` if still within its grace window.
    pub async fn decryption_keys(&self) -> Result<Vec<KeyPair>> {
        self.ensure_valid_keys().await?;
        let state = self.inner.state.lock().await;
        let mut keys = Vec::new();
        if let Some(current) = &state.current {
            keys.push(current.clone());
        }
        if let (Some(previous), Some(deadline)) = (&state.previous, state.grace_until) {
            if Utc::now() < deadline {
                keys.push(previous.clone());
            }
        }
        Ok(keys)
    }

    pub async fn status(&self) -> ManagerStatus {
        let state = self.inner.state.lock().await;
        let has_keys = state.current.is_some();
        let keys_valid = state
            .current
            .as_ref()
            .map(|k| lifecycle::validate(k).ok)
            .unwrap_or(false);
        let keys_expired = state
            .current
            .as_ref()
            .map(|k| lifecycle::is_expired(k, Utc::now()))
            .unwrap_or(true);

        ManagerStatus {
            has_keys,
            keys_valid,
            keys_expired,
            is_rotating: state.rotation.is_rotating,
            current_version: state.current.as_ref().map(|k| k.version()),
            created_at: state.current.as_ref().map(|k| k.metadata.created_at),
            expires_at: state.current.as_ref().map(|k| k.metadata.expires_at),
            cert_path: self.inner.config.cert_path.clone(),
            last_rotation: state.rotation.started_at,
        }
    }

    pub async fn health_check(&self) -> HealthCheck {
        let state_initialized = self.inner.state.lock().await.initialized;
        let status = self.status().await;

        let mut issues = Vec::new();
        if !state_initialized {
            issues.push("key manager is not initialized".to_string());
        }
        if !status.has_keys {
            issues.push("no key pair is currently loaded".to_string());
        }
        if status.keys_expired {
            issues.push("current key pair has expired".to_string());
        }
        if status.has_keys && !status.keys_valid {
            issues.push("current key pair failed validation".to_string());
        }

        HealthCheck {
            healthy: issues.is_empty(),
            issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &std::path::Path) -> KeyManagerConfig {
        KeyManagerConfig {
            cert_path: dir.to_path_buf(),
            rotation_grace_period_minutes: 5,
            ..KeyManagerConfig::default()
        }
    }

    #[tokio::test]
    async fn initialize_generates_keys_when_store_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manager = KeyManager::new(test_config(dir.path()));
        manager.initialize().await.unwrap();

        let status = manager.status().await;
        assert!(status.has_keys);
        assert_eq!(status.current_version, Some(1));
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let manager = KeyManager::new(test_config(dir.path()));
        manager.initialize().await.unwrap();
        manager.initialize().await.unwrap();
        let status = manager.status().await;
        assert_eq!(status.current_version, Some(1));
    }

    #[tokio::test]
    async fn initialize_fails_fast_without_auto_generate_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.auto_generate = false;
        let manager = KeyManager::new(config);
        let err = manager.initialize().await.unwrap_err();
        assert!(matches!(err, Error::KeyManagerInitialization { .. }));
    }

    #[tokio::test]
    async fn rotate_keys_bumps_version_and_keeps_previous_in_grace_window() {
        let dir = tempfile::tempdir().unwrap();
        let manager = KeyManager::new(test_config(dir.path()));
        manager.initialize().await.unwrap();

        manager.rotate_keys(RotationReason::ManualRotation).await.unwrap();
        let status = manager.status().await;
        assert_eq!(status.current_version, Some(2));

        let keys = manager.decryption_keys().await.unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].version(), 2);
        assert_eq!(keys[1].version(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_rotations_produce_exactly_one_new_version() {
        let dir = tempfile::tempdir().unwrap();
        let manager = KeyManager::new(test_config(dir.path()));
        manager.initialize().await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..5 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move {
                manager.rotate_keys(RotationReason::ScheduledRotation).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let status = manager.status().await;
        assert_eq!(status.current_version, Some(2));
    }

    #[tokio::test]
    async fn version_persists_across_manager_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let manager = KeyManager::new(config.clone());
        manager.initialize().await.unwrap();
        manager.rotate_keys(RotationReason::ManualRotation).await.unwrap();
        assert_eq!(manager.status().await.current_version, Some(2));

        let restarted = KeyManager::new(config);
        restarted.initialize().await.unwrap();
        assert_eq!(restarted.status().await.current_version, Some(2));

        restarted.rotate_keys(RotationReason::ManualRotation).await.unwrap();
        assert_eq!(restarted.status().await.current_version, Some(3));
    }

    #[tokio::test]
    async fn health_check_reports_unhealthy_before_initialize() {
        let dir = tempfile::tempdir().unwrap();
        let manager = KeyManager::new(test_config(dir.path()));
        let health = manager.health_check().await;
        assert!(!health.healthy);
    }
}
