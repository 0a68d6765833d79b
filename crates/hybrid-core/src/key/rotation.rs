//! Append-only rotation log with TTL-cached reads (component H).

use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::key::keypair::KeyPair;

const OP_LOAD: &str = "rotation::load";
const OP_SAVE: &str = "rotation::append";
const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum RotationReason {
    InitialGeneration,
    ScheduledRotation,
    ManualRotation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationHistoryEntry {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub rotated_at: DateTime<Utc>,
    pub reason: RotationReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationHistory {
    pub total_rotations: u32,
    pub entries: Vec<RotationHistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl RotationHistory {
    fn empty() -> Self {
        let now = Utc::now();
        RotationHistory {
            total_rotations: 0,
            entries: Vec::new(),
            created_at: now,
            last_updated: now,
        }
    }

    pub fn next_version(&self) -> u32 {
        self.entries.iter().map(|e| e.version).max().unwrap_or(0) + 1
    }

    pub fn stats(&self) -> RotationStats {
        let now = Utc::now();
        let this_year = self
            .entries
            .iter()
            .filter(|e| e.rotated_at.year() == now.year())
            .count();
        let this_month = self
            .entries
            .iter()
            .filter(|e| e.rotated_at.year() == now.year() && e.rotated_at.month() == now.month())
            .count();

        let average_key_lifetime_days = if self.entries.len() > 1 {
            let mut sorted: Vec<_> = self.entries.iter().collect();
            sorted.sort_by_key(|e| e.created_at);
            let mut total_seconds = 0i64;
            for pair in sorted.windows(2) {
                total_seconds += (pair[1].created_at - pair[0].created_at).num_seconds();
            }
            let n = (sorted.len() - 1) as i64;
            ((total_seconds as f64 / n as f64) / 86_400.0).round() as i64
        } else {
            0
        };

        RotationStats {
            total_rotations: self.total_rotations,
            rotations_this_year: this_year,
            rotations_this_month: this_month,
            oldest: self.entries.iter().min_by_key(|e| e.rotated_at).cloned(),
            newest: self.entries.iter().max_by_key(|e| e.rotated_at).cloned(),
            average_key_lifetime_days,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RotationStats {
    pub total_rotations: u32,
    pub rotations_this_year: usize,
    pub rotations_this_month: usize,
    pub oldest: Option<RotationHistoryEntry>,
    pub newest: Option<RotationHistoryEntry>,
    pub average_key_lifetime_days: i64,
}

struct Cache {
    history: RotationHistory,
    fetched_at: Instant,
}

/// TTL-cached handle onto a `rotation-history.json` file.
pub struct RotationLog {
    path: std::path::PathBuf,
    cache: Mutex<Option<Cache>>,
}

impl RotationLog {
    pub fn new(cert_path: &Path) -> Self {
        RotationLog {
            path: cert_path.join("rotation-history.json"),
            cache: Mutex::new(None),
        }
    }

    /// Reads the log, serving a cached copy younger than the TTL. On parse
    /// failure the log is treated as empty (non-fatal); the next append
    /// recreates the file.
    pub fn read(&self) -> RotationHistory {
        let mut cache = self.cache.lock().expect("rotation log cache poisoned");
        if let Some(entry) = cache.as_ref() {
            if entry.fetched_at.elapsed() < CACHE_TTL {
                return entry.history.clone();
            }
        }
        let history = self.load_from_disk();
        *cache = Some(Cache {
            history: history.clone(),
            fetched_at: Instant::now(),
        });
        history
    }

    fn load_from_disk(&self) -> RotationHistory {
        match std::fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!(operation = OP_LOAD, error = %e, "rotation history parse failed, treating as empty");
                RotationHistory::empty()
            }),
            Err(_) => RotationHistory::empty(),
        }
    }

    /// Appends a new entry, persists the document, and invalidates the cache.
    pub fn append(&self, keys: &KeyPair, reason: RotationReason) -> Result<()> {
        let mut history = self.load_from_disk();
        history.entries.push(RotationHistoryEntry {
            version: keys.version(),
            created_at: keys.metadata.created_at,
            expires_at: keys.metadata.expires_at,
            rotated_at: Utc::now(),
            reason,
        });
        history.total_rotations += 1;
        history.last_updated = Utc::now();

        let bytes = serde_json::to_vec_pretty(&history).map_err(|e| Error::KeyManagerStorage {
            operation: OP_SAVE,
            cause: None,
            message: format!("failed to serialize rotation history: {e}"),
        })?;
        crate::key::store::atomic_write(&self.path, &bytes)?;

        *self.cache.lock().expect("rotation log cache poisoned") = Some(Cache {
            history,
            fetched_at: Instant::now(),
        });
        Ok(())
    }
}
