//! Freshness detection: timestamps only, no content hashing.
//!
//! A compiled artifact is fresh when it exists and is at least as new as
//! both its source file and the source's sidecar meta file.

pub mod mtime;

pub use mtime::{is_newer, is_stale};
