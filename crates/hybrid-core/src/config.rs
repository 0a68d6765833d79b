//! Typed configuration surface, read from the process environment.
//!
//! No file-format parser lives here by design: "configuration file loading"
//! is an explicit non-goal of this crate.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::preset::Preset;

/// Options the key manager needs to stand up (spec §3 `KeyManagerConfig`).
#[derive(Debug, Clone)]
pub struct KeyManagerConfig {
    pub preset: Preset,
    pub cert_path: PathBuf,
    pub key_expiry_months: u32,
    pub auto_generate: bool,
    pub enable_file_backup: bool,
    pub rotation_grace_period_minutes: u32,
    pub rotation_interval_weeks: u32,
}

impl Default for KeyManagerConfig {
    fn default() -> Self {
        KeyManagerConfig {
            preset: Preset::Normal,
            cert_path: PathBuf::from("./config/certs"),
            key_expiry_months: 1,
            auto_generate: true,
            enable_file_backup: true,
            rotation_grace_period_minutes: 5,
            rotation_interval_weeks: 1,
        }
    }
}

impl KeyManagerConfig {
    /// Reads `HYBRID_*` environment variables, falling back to defaults, and
    /// validates the result.
    pub fn from_env() -> Result<Self> {
        let mut config = KeyManagerConfig::default();

        if let Ok(preset) = std::env::var("HYBRID_PRESET") {
            config.preset = match preset.as_str() {
                "normal" => Preset::Normal,
                "high-security" => Preset::HighSecurity,
                other => {
                    return Err(Error::Config {
                        message: format!("unknown HYBRID_PRESET value: {other}"),
                    })
                }
            };
        }
        if let Ok(path) = std::env::var("HYBRID_CERT_PATH") {
            config.cert_path = PathBuf::from(path);
        }
        if let Ok(months) = std::env::var("HYBRID_KEY_EXPIRY_MONTHS") {
            config.key_expiry_months = parse_u32(&months, "HYBRID_KEY_EXPIRY_MONTHS")?;
        }
        if let Ok(flag) = std::env::var("HYBRID_AUTO_GENERATE") {
            config.auto_generate = parse_bool(&flag, "HYBRID_AUTO_GENERATE")?;
        }
        if let Ok(flag) = std::env::var("HYBRID_ENABLE_FILE_BACKUP") {
            config.enable_file_backup = parse_bool(&flag, "HYBRID_ENABLE_FILE_BACKUP")?;
        }
        if let Ok(minutes) = std::env::var("HYBRID_ROTATION_GRACE_PERIOD_MINUTES") {
            config.rotation_grace_period_minutes =
                parse_u32(&minutes, "HYBRID_ROTATION_GRACE_PERIOD_MINUTES")?;
        }
        if let Ok(weeks) = std::env::var("HYBRID_ROTATION_INTERVAL_WEEKS") {
            config.rotation_interval_weeks = parse_u32(&weeks, "HYBRID_ROTATION_INTERVAL_WEEKS")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the config in isolation, without touching the filesystem.
    pub fn validate(&self) -> Result<()> {
        validate_cert_path(&self.cert_path)?;
        if self.key_expiry_months == 0 {
            return Err(Error::Config {
                message: "key_expiry_months must be > 0".into(),
            });
        }
        if !(1..=30).contains(&self.rotation_interval_weeks) {
            return Err(Error::Config {
                message: format!(
                    "rotation_interval_weeks must be in 1..=30, got {}",
                    self.rotation_interval_weeks
                ),
            });
        }
        Ok(())
    }
}

/// `cert_path` must be non-empty, must not traverse via `..`, and its
/// resolved absolute form must lie within the process's current working
/// directory.
fn validate_cert_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(Error::Config {
            message: "cert_path must not be empty".into(),
        });
    }
    if path.components().any(|c| c == std::path::Component::ParentDir) {
        return Err(Error::Config {
            message: format!("cert_path must not contain `..`: {}", path.display()),
        });
    }

    let cwd = std::env::current_dir().map_err(|e| Error::Config {
        message: format!("could not resolve current working directory: {e}"),
    })?;
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };
    // The target directory need not exist yet (the key manager creates it),
    // so compare the lexically-normalized path rather than canonicalizing.
    let normalized = normalize(&joined);
    if !normalized.starts_with(&cwd) {
        return Err(Error::Config {
            message: format!(
                "cert_path must resolve inside the working directory: {}",
                path.display()
            ),
        });
    }
    Ok(())
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn parse_u32(raw: &str, var: &'static str) -> Result<u32> {
    raw.parse::<u32>().map_err(|_| Error::Config {
        message: format!("{var} must be a non-negative integer, got `{raw}`"),
    })
}

fn parse_bool(raw: &str, var: &'static str) -> Result<bool> {
    match raw {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(Error::Config {
            message: format!("{var} must be true/false/1/0, got `{other}`"),
        }),
    }
}
