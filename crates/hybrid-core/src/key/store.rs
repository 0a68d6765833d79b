//! On-disk key persistence: binary key files, JSON metadata, backups, and
//! permission hardening (component G).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::key::keypair::{KeyMetadata, KeyPair};
use crate::preset::Preset;

const OP_SAVE: &str = "store::save";
const OP_LOAD: &str = "store::load";
const OP_BACKUP: &str = "store::backup_expired";
const OP_CLEANUP: &str = "store::cleanup_old_backups";

#[derive(Debug, Serialize, Deserialize)]
struct OnDiskMetadata {
    preset: Preset,
    version: u32,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_rotation: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
    public_key_path: String,
    private_key_path: String,
}

pub struct KeyStore {
    cert_path: PathBuf,
}

impl KeyStore {
    pub fn new(cert_path: PathBuf) -> Self {
        KeyStore { cert_path }
    }

    fn public_key_path(&self) -> PathBuf {
        self.cert_path.join("public-key.bin")
    }

    fn private_key_path(&self) -> PathBuf {
        self.cert_path.join("private-key.bin")
    }

    fn metadata_path(&self) -> PathBuf {
        self.cert_path.join("key-metadata.json")
    }

    fn backup_dir(&self) -> PathBuf {
        self.cert_path.join("backup")
    }

    /// Writes the three files. The private key is written with restrictive
    /// permissions before any other process can observe it; each file is
    /// written atomically via a temp file plus rename so a concurrent reader
    /// never observes a half-written file.
    pub fn save(&self, keys: &KeyPair, key_expiry_months: u32) -> Result<()> {
        std::fs::create_dir_all(&self.cert_path).map_err(|e| Error::KeyManagerStorage {
            operation: OP_SAVE,
            cause: Some(e),
            message: format!("failed to create cert_path {}", self.cert_path.display()),
        })?;

        atomic_write(&self.private_key_path(), keys.secret_key())?;
        harden_permissions(&self.private_key_path())?;
        atomic_write(&self.public_key_path(), &keys.public_key)?;

        let metadata = OnDiskMetadata {
            preset: keys.preset(),
            version: keys.version(),
            created_at: keys.metadata.created_at,
            last_rotation: Some(Utc::now()),
            expires_at: Some(keys.metadata.expires_at),
            public_key_path: self.public_key_path().display().to_string(),
            private_key_path: self.private_key_path().display().to_string(),
        };
        let bytes = serde_json::to_vec_pretty(&metadata).map_err(|e| Error::KeyManagerStorage {
            operation: OP_SAVE,
            cause: None,
            message: format!("failed to serialize key metadata: {e}"),
        })?;
        atomic_write(&self.metadata_path(), &bytes)?;
        let _ = key_expiry_months;
        Ok(())
    }

    /// Returns `None` if any of the three files is missing, any binary is
    /// empty, or metadata lacks `preset`, `created_at`, or `version`.
    /// `expires_at`, if absent, is recomputed from `created_at` and
    /// `key_expiry_months`.
    pub fn load(&self, key_expiry_months: u32) -> Option<KeyPair> {
        let public_key = std::fs::read(self.public_key_path()).ok()?;
        let secret_key = std::fs::read(self.private_key_path()).ok()?;
        if public_key.is_empty() || secret_key.is_empty() {
            return None;
        }
        let metadata_bytes = std::fs::read(self.metadata_path()).ok()?;
        let metadata: OnDiskMetadata = serde_json::from_slice(&metadata_bytes).ok()?;

        let expires_at = metadata
            .expires_at
            .unwrap_or_else(|| metadata.created_at + chrono::Duration::days(30 * key_expiry_months as i64));

        Some(KeyPair::new(
            public_key,
            secret_key,
            KeyMetadata {
                preset: metadata.preset,
                version: metadata.version,
                created_at: metadata.created_at,
                expires_at,
            },
        ))
    }

    /// Copies both binaries into `backup/` with a `YYYY-MM` suffix. Failure
    /// is a warning, never an error that aborts rotation.
    pub fn backup_expired(&self, keys: &KeyPair) {
        if let Err(e) = self.try_backup_expired(keys) {
            tracing::warn!(operation = OP_BACKUP, error = %e, "key backup failed, continuing rotation");
        }
    }

    fn try_backup_expired(&self, keys: &KeyPair) -> Result<()> {
        let stamp = Utc::now().format("%Y-%m").to_string();
        std::fs::create_dir_all(self.backup_dir()).map_err(|e| Error::KeyManagerStorage {
            operation: OP_BACKUP,
            cause: Some(e),
            message: "failed to create backup directory".into(),
        })?;
        atomic_write(
            &self.backup_dir().join(format!("pub-key-expired-{stamp}.bin")),
            &keys.public_key,
        )?;
        atomic_write(
            &self.backup_dir().join(format!("priv-key-expired-{stamp}.bin")),
            keys.secret_key(),
        )?;
        Ok(())
    }

    /// Deletes backup files whose `YYYY-MM` stamp is older than three months.
    pub fn cleanup_old_backups(&self) {
        if let Err(e) = self.try_cleanup_old_backups() {
            tracing::warn!(operation = OP_CLEANUP, error = %e, "backup cleanup failed");
        }
    }

    fn try_cleanup_old_backups(&self) -> Result<()> {
        let cutoff = Utc::now() - chrono::Duration::days(90);
        let dir = self.backup_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(()),
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(stamp) = extract_stamp(&name) {
                if let Ok(date) = chrono::NaiveDate::parse_from_str(&format!("{stamp}-01"), "%Y-%m-%d") {
                    let date = DateTime::<Utc>::from_naive_utc_and_offset(
                        date.and_hms_opt(0, 0, 0).unwrap(),
                        Utc,
                    );
                    if date < cutoff {
                        let _ = std::fs::remove_file(entry.path());
                    }
                }
            }
        }
        Ok(())
    }
}

fn extract_stamp(filename: &str) -> Option<String> {
    let stripped = filename
        .strip_prefix("pub-key-expired-")
        .or_else(|| filename.strip_prefix("priv-key-expired-"))?;
    stripped.strip_suffix(".bin").map(|s| s.to_string())
}

fn harden_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms).map_err(|e| Error::KeyManagerStorage {
            operation: OP_SAVE,
            cause: Some(e),
            message: format!("failed to set permissions on {}", path.display()),
        })?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

/// Writes `bytes` to `path` via a temp file in the same directory followed by
/// a rename, so a concurrent reader sees either the old or the new content,
/// never a partial write.
pub(crate) fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| Error::KeyManagerStorage {
        operation: OP_SAVE,
        cause: Some(e),
        message: format!("failed to create directory {}", dir.display()),
    })?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::KeyManagerStorage {
        operation: OP_SAVE,
        cause: Some(e),
        message: "failed to create temp file".into(),
    })?;
    use std::io::Write;
    tmp.write_all(bytes).map_err(|e| Error::KeyManagerStorage {
        operation: OP_SAVE,
        cause: Some(e),
        message: "failed to write temp file".into(),
    })?;
    tmp.persist(path).map_err(|e| Error::KeyManagerStorage {
        operation: OP_SAVE,
        cause: Some(e.error),
        message: format!("failed to rename temp file into place at {}", path.display()),
    })?;
    Ok(())
}
