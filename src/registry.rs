//! Resource registry: the authoritative set of known source resources.
//!
//! Items are bucketed by path hash, but identity is the full path, so two
//! paths that collide on the hash both stay registered.
//!
//! The registry and its extension table share one lock. Readers that need to
//! iterate take a [`RegistryGuard`] instead of a snapshot: large tables are
//! not copied on every call, at the price of blocking writers (including the
//! watcher thread) until the guard is released.

use std::ops::Deref;

use parking_lot::{Mutex, MutexGuard};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use thiserror::Error;

use crate::core::{ResourceItem, ResourcePath, ResourceType};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("extension `{ext}` is already registered as `{existing}`")]
    ExtensionTaken { ext: String, existing: ResourceType },

    #[error("`{0}` is not a valid extension")]
    InvalidExtension(String),
}

type Bucket = SmallVec<[ResourceItem; 1]>;

/// Registry contents, only reachable through the registry lock.
#[derive(Debug, Default)]
pub struct RegistryTable {
    buckets: FxHashMap<u64, Bucket>,
    extensions: FxHashMap<String, ResourceType>,
    len: usize,
}

impl RegistryTable {
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, path: &ResourcePath) -> Option<&ResourceItem> {
        self.buckets
            .get(&path.path_hash())?
            .iter()
            .find(|item| item.path == *path)
    }

    #[inline]
    pub fn contains(&self, path: &ResourcePath) -> bool {
        self.get(path).is_some()
    }

    /// Iterate all items (no ordering guarantee).
    pub fn iter(&self) -> impl Iterator<Item = &ResourceItem> {
        self.buckets.values().flatten()
    }

    /// Registered extension table, sorted by extension.
    pub fn extensions(&self) -> Vec<(&str, &ResourceType)> {
        let mut table: Vec<_> = self
            .extensions
            .iter()
            .map(|(ext, kind)| (ext.as_str(), kind))
            .collect();
        table.sort_unstable();
        table
    }

    /// Resolve a type from the extension of the sub-resource part.
    pub fn resource_type(&self, path: &ResourcePath) -> Option<ResourceType> {
        let ext = path.extension()?;
        self.extensions.get(&ext).cloned()
    }

    /// Insert unless the same path is already present. Returns `true` if
    /// the item was inserted.
    fn insert(&mut self, item: ResourceItem) -> bool {
        let bucket = self.buckets.entry(item.path.path_hash()).or_default();
        if bucket.iter().any(|existing| existing.path == item.path) {
            return false;
        }
        bucket.push(item);
        self.len += 1;
        true
    }

    /// Remove every item whose underlying file is `file`.
    fn remove_under(&mut self, file: &str) -> Vec<ResourcePath> {
        let mut removed = Vec::new();
        self.buckets.retain(|_, bucket| {
            bucket.retain(|item| {
                if item.path.file() != file {
                    return true;
                }
                removed.push(item.path.clone());
                false
            });
            !bucket.is_empty()
        });
        self.len -= removed.len();
        removed
    }
}

/// Lock-guarded view of the registry.
///
/// Every other registry operation blocks while this is alive. Release it
/// with [`RegistryGuard::unlock`] (or by dropping it).
pub struct RegistryGuard<'a> {
    table: MutexGuard<'a, RegistryTable>,
}

impl RegistryGuard<'_> {
    /// Release the registry lock.
    pub fn unlock(self) {
        drop(self.table);
    }
}

impl Deref for RegistryGuard<'_> {
    type Target = RegistryTable;

    fn deref(&self) -> &RegistryTable {
        &self.table
    }
}

/// Thread-safe resource registry.
#[derive(Debug, Default)]
pub struct Registry {
    table: Mutex<RegistryTable>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a file extension to a resource type.
    ///
    /// Extensions are matched case-insensitively and without the dot.
    /// Re-registering an extension to the same type is a no-op.
    pub fn register_extension(&self, ext: &str, kind: ResourceType) -> Result<(), RegistryError> {
        let ext = normalize_extension(ext)?;
        let mut table = self.table.lock();
        match table.extensions.get(&ext) {
            Some(existing) if *existing == kind => Ok(()),
            Some(existing) => Err(RegistryError::ExtensionTaken {
                ext,
                existing: existing.clone(),
            }),
            None => {
                table.extensions.insert(ext, kind);
                Ok(())
            }
        }
    }

    /// Whether `ext` is registered as `kind`.
    pub fn accepts_extension(&self, ext: &str, kind: &ResourceType) -> bool {
        let Ok(ext) = normalize_extension(ext) else {
            return false;
        };
        self.table.lock().extensions.get(&ext) == Some(kind)
    }

    pub fn resource_type(&self, path: &ResourcePath) -> Option<ResourceType> {
        self.table.lock().resource_type(path)
    }

    /// Register a resource. Idempotent by path; returns `true` if inserted.
    pub fn add(&self, path: ResourcePath, kind: ResourceType) -> bool {
        self.table.lock().insert(ResourceItem { path, kind })
    }

    /// Register every path whose type resolves; unknown types are skipped.
    /// Takes the lock once. Returns the number of newly inserted items.
    pub fn restore(&self, paths: impl IntoIterator<Item = ResourcePath>) -> usize {
        let mut table = self.table.lock();
        let mut inserted = 0;
        for path in paths {
            let Some(kind) = table.resource_type(&path) else {
                crate::debug!("registry"; "no type for {}, skipped", path);
                continue;
            };
            if table.insert(ResourceItem { path, kind }) {
                inserted += 1;
            }
        }
        inserted
    }

    /// Remove every resource rooted at `file` (the file itself and all of its
    /// sub-resources) and return their paths.
    pub fn remove_under(&self, file: &ResourcePath) -> Vec<ResourcePath> {
        self.table.lock().remove_under(file.file())
    }

    /// Lock the registry for iteration.
    pub fn lock(&self) -> RegistryGuard<'_> {
        RegistryGuard {
            table: self.table.lock(),
        }
    }

    /// Copy of all items, sorted by path (tooling / UI).
    pub fn snapshot(&self) -> Vec<ResourceItem> {
        let mut items: Vec<_> = self.table.lock().iter().cloned().collect();
        items.sort_by(|a, b| a.path.cmp(&b.path));
        items
    }

    pub fn contains(&self, path: &ResourcePath) -> bool {
        self.table.lock().contains(path)
    }

    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn normalize_extension(ext: &str) -> Result<String, RegistryError> {
    let trimmed = ext.trim().trim_start_matches('.');
    if trimmed.is_empty() || trimmed.contains(['/', '\\', '.']) {
        return Err(RegistryError::InvalidExtension(ext.to_string()));
    }
    Ok(trimmed.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texture() -> ResourceType {
        ResourceType::new("texture")
    }

    fn registry() -> Registry {
        let registry = Registry::new();
        registry.register_extension("png", texture()).unwrap();
        registry.register_extension("ani", ResourceType::new("animation")).unwrap();
        registry
    }

    #[test]
    fn test_add_is_idempotent() {
        let registry = registry();
        let path = ResourcePath::new("textures/grass.png");

        assert!(registry.add(path.clone(), texture()));
        let size = registry.len();
        assert!(!registry.add(path.clone(), texture()));
        assert_eq!(registry.len(), size);
        assert!(!registry.add(ResourcePath::new("textures\\grass.png"), texture()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_hash_collision_keeps_both() {
        let registry = registry();
        let a = ResourcePath::with_hash("a.png", 42);
        let b = ResourcePath::with_hash("b.png", 42);

        assert!(registry.add(a.clone(), texture()));
        assert!(registry.add(b.clone(), texture()));

        let table = registry.lock();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(&a).map(|i| &i.path), Some(&a));
        assert_eq!(table.get(&b).map(|i| &i.path), Some(&b));
        table.unlock();

        let removed = registry.remove_under(&a);
        assert_eq!(removed, vec![a]);
        assert!(registry.contains(&b));
    }

    #[test]
    fn test_resource_type_uses_subresource_part() {
        let registry = registry();
        assert_eq!(
            registry.resource_type(&ResourcePath::new("walk.ani:models/hero.fbx")),
            Some(ResourceType::new("animation"))
        );
        assert_eq!(
            registry.resource_type(&ResourcePath::new("textures/GRASS.PNG")),
            Some(texture())
        );
        assert_eq!(registry.resource_type(&ResourcePath::new("notes.txt")), None);
    }

    #[test]
    fn test_register_extension_conflict() {
        let registry = registry();
        assert!(registry.register_extension(".PNG", texture()).is_ok());
        assert!(matches!(
            registry.register_extension("png", ResourceType::new("image")),
            Err(RegistryError::ExtensionTaken { .. })
        ));
        assert!(matches!(
            registry.register_extension("", texture()),
            Err(RegistryError::InvalidExtension(_))
        ));
    }

    #[test]
    fn test_accepts_extension() {
        let registry = registry();
        assert!(registry.accepts_extension("png", &texture()));
        assert!(registry.accepts_extension(".Png", &texture()));
        assert!(!registry.accepts_extension("png", &ResourceType::new("animation")));
        assert!(!registry.accepts_extension("tga", &texture()));
    }

    #[test]
    fn test_remove_under_takes_subresources() {
        let registry = registry();
        let file = ResourcePath::new("models/hero.fbx");
        let walk = ResourcePath::new("walk.ani:models/hero.fbx");
        let run = ResourcePath::new("run.ani:models/hero.fbx");
        let other = ResourcePath::new("idle.ani:models/villain.fbx");

        for path in [&walk, &run, &other] {
            registry.add(path.clone(), ResourceType::new("animation"));
        }

        let mut removed = registry.remove_under(&file);
        removed.sort();
        assert_eq!(removed, vec![run, walk]);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&other));
    }

    #[test]
    fn test_restore_skips_unknown_types() {
        let registry = registry();
        let inserted = registry.restore([
            ResourcePath::new("a.png"),
            ResourcePath::new("b.unknown"),
            ResourcePath::new("a.png"),
        ]);
        assert_eq!(inserted, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_snapshot_sorted() {
        let registry = registry();
        registry.add(ResourcePath::new("b.png"), texture());
        registry.add(ResourcePath::new("a.png"), texture());

        let paths: Vec<_> = registry
            .snapshot()
            .into_iter()
            .map(|item| item.path.as_str().to_string())
            .collect();
        assert_eq!(paths, ["a.png", "b.png"]);
    }
}
