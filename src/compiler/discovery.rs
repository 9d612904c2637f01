//! Startup reconciliation and per-file discovery.

use super::AssetCompiler;
use crate::core::{ResourceItem, ResourcePath};
use crate::freshness::is_newer;

/// Counts from [`AssetCompiler::initialize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Resources restored from the manifest.
    pub restored: usize,
    /// Dependency entries restored from the manifest.
    pub dependencies: usize,
    /// Files seen by the directory walk.
    pub files: usize,
    /// Resources newly registered by the walk.
    pub discovered: usize,
}

impl AssetCompiler {
    /// Load the manifest, then walk the project and discover every file
    /// that is newer than the manifest or missing from the registry.
    pub fn initialize(&self) -> ScanSummary {
        let shared = &self.shared;
        let fs = &*shared.fs;

        let manifest = shared.manifest.load(fs);
        let cutoff = shared.manifest.modified(fs);

        let mut summary = ScanSummary {
            restored: shared.registry.restore(manifest.resources),
            dependencies: manifest.dependencies.len(),
            ..ScanSummary::default()
        };
        {
            let mut deps = shared.deps.write();
            for (dependency, dependents) in manifest.dependencies {
                deps.insert(dependency, dependents);
            }
        }

        for entry in fs.walk() {
            if shared.layout.is_internal(&entry.path) {
                continue;
            }
            summary.files += 1;
            if is_newer(entry.modified, cutoff) || !shared.registry.contains(&entry.path) {
                summary.discovered += self.discover(&entry.path);
            }
        }

        crate::debug!(
            "scan";
            "restored {}, walked {} files, discovered {}",
            summary.restored,
            summary.files,
            summary.discovered
        );
        summary
    }

    /// Register the resources contained in `file`: the plugin for its
    /// extension enumerates them, otherwise the file itself is registered
    /// when its extension has a type. Returns the number newly inserted.
    pub fn discover(&self, file: &ResourcePath) -> usize {
        let shared = &self.shared;
        let items = match shared.plugins.for_path(file) {
            Some(plugin) => plugin.enumerate_subresources(&shared.registry, file),
            None => shared
                .registry
                .resource_type(file)
                .map(|kind| vec![ResourceItem::new(file.clone(), kind)])
                .unwrap_or_default(),
        };

        items
            .into_iter()
            .filter(|item| shared.registry.add(item.path.clone(), item.kind.clone()))
            .count()
    }
}
