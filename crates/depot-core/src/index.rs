use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::digest::sha256_file;
use crate::filename::parse_archive_name;
use crate::version::newest_first;

/// One archive file as captured at index build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    pub version: String,
    pub filename: String,
    pub size: u64,
    pub hash: String,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
}

/// Immutable mapping from package name to its entries, newest version first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ServerIndex {
    packages: BTreeMap<String, Vec<ArchiveEntry>>,
}

impl ServerIndex {
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&[ArchiveEntry]> {
        self.packages.get(name).map(Vec::as_slice)
    }

    pub fn packages(&self) -> &BTreeMap<String, Vec<ArchiveEntry>> {
        &self.packages
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ArchiveEntry])> {
        self.packages
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.as_slice()))
    }
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to list package directory {}", path.display())]
    DirectoryUnreadable { path: PathBuf, source: io::Error },

    #[error("failed to read archive {}", path.display())]
    Hash { path: PathBuf, source: io::Error },
}

/// Result of a scan: the index plus every per-file or directory failure.
#[derive(Debug)]
pub struct ScanOutcome {
    pub index: ServerIndex,
    pub failures: Vec<IndexError>,
}

/// Scans a flat package directory into a [`ServerIndex`].
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    root: PathBuf,
}

impl IndexBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build a fresh index, logging and dropping any failures.
    pub fn build(&self) -> ServerIndex {
        self.scan().index
    }

    pub fn scan(&self) -> ScanOutcome {
        let mut failures = Vec::new();
        let mut filenames = match list_filenames(&self.root) {
            Ok(filenames) => filenames,
            Err(source) => {
                tracing::error!(
                    path = %self.root.display(),
                    error = %source,
                    "package directory unreadable; serving an empty index"
                );
                failures.push(IndexError::DirectoryUnreadable {
                    path: self.root.clone(),
                    source,
                });
                return ScanOutcome {
                    index: ServerIndex::default(),
                    failures,
                };
            }
        };
        // Enumeration order is platform dependent; fix it so equal versions
        // keep a stable relative order after sorting.
        filenames.sort();

        let mut packages: BTreeMap<String, Vec<ArchiveEntry>> = BTreeMap::new();
        for filename in filenames {
            let Some(parsed) = parse_archive_name(&filename) else {
                tracing::debug!(filename = %filename, "skipping non-archive entry");
                continue;
            };
            let path = self.root.join(&filename);
            match read_entry(&path, &filename, parsed.version) {
                Ok(Some(entry)) => packages
                    .entry(parsed.name.to_string())
                    .or_default()
                    .push(entry),
                Ok(None) => {
                    tracing::debug!(filename = %filename, "skipping non-file entry");
                }
                Err(source) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %source,
                        "archive unreadable; excluded from index"
                    );
                    failures.push(IndexError::Hash { path, source });
                }
            }
        }

        for entries in packages.values_mut() {
            entries.sort_by(|a, b| newest_first(&a.version, &b.version));
        }

        ScanOutcome {
            index: ServerIndex { packages },
            failures,
        }
    }
}

fn list_filenames(dir: &Path) -> io::Result<Vec<String>> {
    let mut filenames = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(path = %dir.display(), error = %err, "failed to read directory entry");
                continue;
            }
        };
        match entry.file_name().into_string() {
            Ok(name) => filenames.push(name),
            Err(raw) => {
                tracing::debug!(filename = ?raw, "skipping non-UTF-8 filename");
            }
        }
    }
    Ok(filenames)
}

fn read_entry(path: &Path, filename: &str, version: &str) -> io::Result<Option<ArchiveEntry>> {
    let metadata = fs::metadata(path)?;
    if !metadata.is_file() {
        return Ok(None);
    }
    let uploaded_at = OffsetDateTime::from(metadata.modified()?);
    let hash = sha256_file(path)?;
    Ok(Some(ArchiveEntry {
        version: version.to_string(),
        filename: filename.to_string(),
        size: metadata.len(),
        hash,
        uploaded_at,
    }))
}
