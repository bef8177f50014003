//! Download counters.
//!
//! The index core only needs a narrow store: bump a `name@version` counter and
//! remember the most recent download. [`JsonFileStore`] keeps the counters in a
//! single JSON document that is rewritten after every change;
//! [`MemoryStore`] keeps them in process.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("failed to write download stats to {}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to encode download stats")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastDownload {
    pub package: String,
    pub version: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadStats {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub downloads: BTreeMap<String, u64>,
    #[serde(default)]
    pub last_download: Option<LastDownload>,
}

impl DownloadStats {
    fn apply(&mut self, key: &str, last: LastDownload) -> u64 {
        self.total += 1;
        self.last_download = Some(last);
        let count = self.downloads.entry(key.to_string()).or_insert(0);
        *count += 1;
        *count
    }
}

/// Storage behind the download tracker. Implementations serialize updates
/// so concurrent increments of the same key are never lost.
pub trait CounterStore: Send + Sync {
    /// Increment `key` and the grand total and set `last` as the most recent
    /// download in one update. Returns the new count for `key`.
    fn record(&self, key: &str, last: LastDownload) -> Result<u64, StatsError>;

    fn snapshot(&self) -> DownloadStats;
}

#[derive(Default)]
pub struct MemoryStore {
    stats: Mutex<DownloadStats>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for MemoryStore {
    fn record(&self, key: &str, last: LastDownload) -> Result<u64, StatsError> {
        Ok(self.stats.lock().apply(key, last))
    }

    fn snapshot(&self) -> DownloadStats {
        self.stats.lock().clone()
    }
}

/// Counters persisted as one JSON document.
pub struct JsonFileStore {
    path: PathBuf,
    stats: Mutex<DownloadStats>,
}

impl JsonFileStore {
    /// Load counters from `path`. A missing or unreadable file starts a fresh
    /// store rather than failing.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let stats = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "download stats file is corrupt; starting fresh"
                );
                DownloadStats::default()
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => DownloadStats::default(),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "download stats file unreadable; starting fresh"
                );
                DownloadStats::default()
            }
        };
        Self {
            path,
            stats: Mutex::new(stats),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, stats: &DownloadStats) -> Result<(), StatsError> {
        let bytes = serde_json::to_vec_pretty(stats)?;
        write_atomic(&self.path, &bytes).map_err(|source| StatsError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl CounterStore for JsonFileStore {
    fn record(&self, key: &str, last: LastDownload) -> Result<u64, StatsError> {
        let mut stats = self.stats.lock();
        let count = stats.apply(key, last);
        self.persist(&stats)?;
        Ok(count)
    }

    fn snapshot(&self) -> DownloadStats {
        self.stats.lock().clone()
    }
}

fn write_atomic(dest: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = dest.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, dest)
}

/// Records resolved downloads against a [`CounterStore`].
#[derive(Clone)]
pub struct DownloadTracker {
    store: Arc<dyn CounterStore>,
}

impl DownloadTracker {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    /// Count one download of `package@version`. Persistence failures are
    /// logged and otherwise ignored so the download itself still succeeds.
    pub fn record(&self, package: &str, version: &str) {
        let key = format!("{package}@{version}");
        let last = LastDownload {
            package: package.to_string(),
            version: version.to_string(),
            timestamp: now_millis(),
        };
        match self.store.record(&key, last) {
            Ok(count) => tracing::debug!(key = %key, count, "download counted"),
            Err(err) => tracing::warn!(key = %key, error = %err, "failed to persist download count"),
        }
    }

    pub fn snapshot(&self) -> DownloadStats {
        self.store.snapshot()
    }
}

fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
