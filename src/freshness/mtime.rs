//! Mtime-based staleness checks.
//!
//! All inputs are `Option<SystemTime>`: `None` means the file is missing or
//! its mtime could not be read.

use std::time::SystemTime;

/// Whether an artifact must be recompiled.
///
/// Fresh iff the artifact exists and `artifact >= source` and
/// `artifact >= meta`. A missing source or meta file never makes the
/// artifact stale on its own.
pub fn is_stale(
    artifact: Option<SystemTime>,
    source: Option<SystemTime>,
    meta: Option<SystemTime>,
) -> bool {
    let Some(artifact) = artifact else {
        return true;
    };
    source.is_some_and(|source| artifact < source) || meta.is_some_and(|meta| artifact < meta)
}

/// Whether a file changed after `cutoff`.
///
/// No cutoff (no manifest yet) or an unreadable mtime both count as newer.
pub fn is_newer(modified: Option<SystemTime>, cutoff: Option<SystemTime>) -> bool {
    match (modified, cutoff) {
        (Some(modified), Some(cutoff)) => modified > cutoff,
        _ => true,
    }
}
