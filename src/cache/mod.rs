//! Persistence of the registry and dependency graph between runs.

mod manifest;

pub use manifest::{Manifest, ManifestError, ManifestStore};
