//! Version ordering used by the package index.
//!
//! This is deliberately not semver. Versions are split on `.`, each component
//! is read as an unsigned integer of any width (anything non-numeric counts as
//! 0) and the shorter side is padded with zeros. Pre-release tags therefore
//! collapse: `1.0-beta` and `1.0` compare equal.

use std::cmp::Ordering;

/// Compare two version strings. `Greater` means `a` is newer than `b`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left = components(a);
    let right = components(b);
    let len = left.len().max(right.len());
    for idx in 0..len {
        let l = left.get(idx).copied().unwrap_or(ZERO);
        let r = right.get(idx).copied().unwrap_or(ZERO);
        match compare_digits(l, r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Ordering for descending sorts: newest version first.
pub fn newest_first(a: &str, b: &str) -> Ordering {
    compare_versions(b, a)
}

// Zero is the empty digit string once leading zeros are stripped.
const ZERO: &str = "";

/// Each component as its significant digits, so arbitrarily long numbers
/// still compare by value.
fn components(version: &str) -> Vec<&str> {
    version.split('.').map(significant_digits).collect()
}

fn significant_digits(part: &str) -> &str {
    if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) {
        part.trim_start_matches('0')
    } else {
        ZERO
    }
}

fn compare_digits(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
