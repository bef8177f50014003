use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::index::{ArchiveEntry, IndexBuilder, IndexError, ServerIndex};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("package `{name}` not found")]
    PackageNotFound { name: String },

    #[error("version `{version}` of package `{name}` not found")]
    VersionNotFound {
        name: String,
        version: String,
        available: Vec<String>,
    },

    /// The index references a file that is no longer on disk.
    #[error("archive `{filename}` is indexed but missing on disk")]
    FileMissing {
        name: String,
        version: String,
        filename: String,
    },
}

/// A download target that was present on disk when resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDownload {
    pub name: String,
    pub entry: ArchiveEntry,
    pub path: PathBuf,
}

/// Outcome of a full rescan.
#[derive(Debug)]
pub struct RefreshReport {
    pub packages: usize,
    pub failures: Vec<IndexError>,
}

/// Owner of the live package index.
///
/// Readers always work on a complete snapshot; [`IndexService::refresh`]
/// builds a new index off to the side and publishes it with a single store.
pub struct IndexService {
    builder: IndexBuilder,
    current: ArcSwap<ServerIndex>,
}

impl IndexService {
    /// Scan `root` and serve the result.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self::open_with_report(root).0
    }

    pub fn open_with_report(root: impl Into<PathBuf>) -> (Self, RefreshReport) {
        let builder = IndexBuilder::new(root);
        let outcome = builder.scan();
        let report = RefreshReport {
            packages: outcome.index.len(),
            failures: outcome.failures,
        };
        tracing::info!(
            root = %builder.root().display(),
            packages = report.packages,
            failures = report.failures.len(),
            "package index built"
        );
        let service = Self {
            builder,
            current: ArcSwap::from_pointee(outcome.index),
        };
        (service, report)
    }

    pub fn root(&self) -> &Path {
        self.builder.root()
    }

    pub fn list(&self) -> Arc<ServerIndex> {
        self.current.load_full()
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Case-insensitive substring match on package names. An empty query
    /// matches every package.
    pub fn search(&self, query: &str) -> BTreeMap<String, Vec<ArchiveEntry>> {
        let needle = query.to_lowercase();
        self.current
            .load()
            .iter()
            .filter(|(name, _)| name.to_lowercase().contains(&needle))
            .map(|(name, entries)| (name.to_string(), entries.to_vec()))
            .collect()
    }

    pub fn get(&self, name: &str) -> Result<Vec<ArchiveEntry>, LookupError> {
        self.current
            .load()
            .get(name)
            .map(<[ArchiveEntry]>::to_vec)
            .ok_or_else(|| LookupError::PackageNotFound {
                name: name.to_string(),
            })
    }

    /// Exact lookup; `version` is compared as a literal string.
    pub fn get_version(&self, name: &str, version: &str) -> Result<ArchiveEntry, LookupError> {
        let index = self.current.load();
        let entries = index
            .get(name)
            .ok_or_else(|| LookupError::PackageNotFound {
                name: name.to_string(),
            })?;
        entries
            .iter()
            .find(|entry| entry.version == version)
            .cloned()
            .ok_or_else(|| LookupError::VersionNotFound {
                name: name.to_string(),
                version: version.to_string(),
                available: entries.iter().map(|entry| entry.version.clone()).collect(),
            })
    }

    pub fn latest(&self, name: &str) -> Result<ArchiveEntry, LookupError> {
        self.current
            .load()
            .get(name)
            .and_then(|entries| entries.first())
            .cloned()
            .ok_or_else(|| LookupError::PackageNotFound {
                name: name.to_string(),
            })
    }

    /// Rescan the package directory and publish the result. Returns the new
    /// package count.
    pub fn refresh(&self) -> usize {
        self.refresh_with_report().packages
    }

    pub fn refresh_with_report(&self) -> RefreshReport {
        let outcome = self.builder.scan();
        let packages = outcome.index.len();
        self.current.store(Arc::new(outcome.index));
        tracing::info!(
            packages,
            failures = outcome.failures.len(),
            "package index refreshed"
        );
        RefreshReport {
            packages,
            failures: outcome.failures,
        }
    }

    /// Resolve a download target (latest when `version` is `None`) and check
    /// that the backing file still exists.
    pub fn resolve_download(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<ResolvedDownload, LookupError> {
        let entry = match version {
            Some(version) => self.get_version(name, version)?,
            None => self.latest(name)?,
        };
        let path = self.root().join(&entry.filename);
        if !path.is_file() {
            tracing::warn!(
                package = name,
                filename = %entry.filename,
                "indexed archive missing on disk; index is stale"
            );
            return Err(LookupError::FileMissing {
                name: name.to_string(),
                version: entry.version,
                filename: entry.filename,
            });
        }
        Ok(ResolvedDownload {
            name: name.to_string(),
            entry,
            path,
        })
    }
}
