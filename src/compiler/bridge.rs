//! Change-notification bridge: file events → registry updates → reloads.

use std::io::ErrorKind;

use super::AssetCompiler;
use crate::core::ResourcePath;

/// What a change event did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileChange {
    /// Resources handed to the loader for reload, in order.
    pub reloaded: Vec<ResourcePath>,
    /// Resources newly registered (the changed file and its dependents).
    pub added: usize,
    /// Dependents invalidated because the file changed.
    pub cascaded: Vec<ResourcePath>,
}

impl FileChange {
    pub fn is_empty(&self) -> bool {
        self.reloaded.is_empty() && self.added == 0 && self.cascaded.is_empty()
    }
}

impl AssetCompiler {
    /// Handle a change to `path` (created, modified or deleted).
    ///
    /// The file's resources are removed, rediscovered and reloaded. Then
    /// every direct dependent gets the same treatment, with its artifacts
    /// deleted so the reload recompiles it. Dependents of dependents are
    /// left alone.
    pub fn on_file_changed(&self, path: &ResourcePath) -> FileChange {
        let file = path.file_path();
        let mut change = FileChange::default();
        if file.is_empty() || self.shared.layout.is_internal(&file) {
            return change;
        }

        self.refresh(&file, false, &mut change);
        self.reload_meta_owners(&file, &mut change);

        let dependents = self.shared.deps.write().take_dependents(&file);
        for dependent in dependents {
            crate::debug!("watch"; "{} changed, invalidating {}", file, dependent);
            self.refresh(&dependent.file_path(), true, &mut change);
            change.cascaded.push(dependent);
        }
        change
    }

    /// Remove → rediscover (if the file still exists) → reload.
    fn refresh(&self, file: &ResourcePath, invalidate: bool, change: &mut FileChange) {
        let removed = self.remove_resource(file);

        if invalidate {
            self.remove_artifact(file);
            for resource in &removed {
                self.remove_artifact(resource);
            }
        }

        if self.shared.fs.exists(file.as_str()) {
            change.added += self.discover(file);
        } else {
            crate::debug!("watch"; "{} is gone", file);
        }

        for resource in removed {
            self.shared.loader.reload(&resource);
            change.reloaded.push(resource);
        }
    }

    /// A sidecar meta file changed: reload the resources of the file it
    /// describes. The newer meta makes their artifacts stale.
    fn reload_meta_owners(&self, meta: &ResourcePath, change: &mut FileChange) {
        if meta.file_extension().as_deref() != Some(self.shared.meta_extension.as_str()) {
            return;
        }
        let owners: Vec<ResourcePath> = {
            let table = self.shared.registry.lock();
            table
                .iter()
                .filter(|item| {
                    item.path.file() != meta.as_str() && self.shared.meta_path(&item.path) == *meta
                })
                .map(|item| item.path.clone())
                .collect()
        };
        for resource in owners {
            crate::debug!("watch"; "{} changed, reloading {}", meta, resource);
            self.shared.loader.reload(&resource);
            change.reloaded.push(resource);
        }
    }

    fn remove_artifact(&self, resource: &ResourcePath) {
        let locator = self.shared.layout.locator(resource);
        if let Err(e) = self.shared.fs.remove(&locator)
            && e.kind() != ErrorKind::NotFound
        {
            crate::log!("watch"; "cannot remove {}: {}", locator, e);
        }
    }
}
