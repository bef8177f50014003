//! Package index core for the depot server.
//!
//! This crate turns a flat directory of `<name>-<version>[-<qualifier>].tar.gz`
//! archives into a queryable, atomically swappable index, and records download
//! counters through a pluggable store. The HTTP surface lives in `depot-host`.

pub mod digest;
pub mod filename;
pub mod index;
pub mod service;
pub mod stats;
pub mod version;

pub use digest::sha256_file;
pub use filename::{ARCHIVE_EXTENSION, ArchiveName, parse_archive_name};
pub use index::{ArchiveEntry, IndexBuilder, IndexError, ScanOutcome, ServerIndex};
pub use service::{IndexService, LookupError, RefreshReport, ResolvedDownload};
pub use stats::{
    CounterStore, DownloadStats, DownloadTracker, JsonFileStore, LastDownload, MemoryStore,
    StatsError,
};
pub use version::{compare_versions, newest_first};
