//! Archive filename parsing.
//!
//! Filenames follow `<name>-<version>[-<qualifier>].tar.gz`. Both the name and
//! the version are matched non-greedily: the name ends at the first usable `-`
//! and the version ends at the next one. A name that itself contains hyphens is
//! therefore split early (`my-tool-2.0.0.tar.gz` yields name `my`, version
//! `tool`). This is a known limitation and is kept as-is so that existing
//! package directories keep indexing the same way.

/// Extension every indexed archive must carry.
pub const ARCHIVE_EXTENSION: &str = ".tar.gz";

/// Components recovered from an archive filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName<'a> {
    pub name: &'a str,
    pub version: &'a str,
    /// Trailing architecture or qualifier segment, if any. Not indexed.
    pub qualifier: Option<&'a str>,
}

/// Parse `filename` into its package name and version.
///
/// Returns `None` for anything that is not a recognisable archive; callers
/// skip those silently.
pub fn parse_archive_name(filename: &str) -> Option<ArchiveName<'_>> {
    let base = filename.strip_suffix(ARCHIVE_EXTENSION)?;
    let (name, rest) = split_first_hyphen(base)?;
    let (version, qualifier) = match split_first_hyphen(rest) {
        Some((version, qualifier)) => (version, Some(qualifier)),
        None => (rest, None),
    };
    Some(ArchiveName {
        name,
        version,
        qualifier,
    })
}

/// Split at the first `-` that has at least one byte on each side.
fn split_first_hyphen(input: &str) -> Option<(&str, &str)> {
    input
        .match_indices('-')
        .map(|(idx, _)| idx)
        .find(|&idx| idx > 0 && idx + 1 < input.len())
        .map(|idx| (&input[..idx], &input[idx + 1..]))
}
