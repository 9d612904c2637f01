//! Persisted manifest of known resources and dependency edges.
//!
//! ```json
//! {
//!   "resources": ["models/hero.fbx", "walk.ani:models/hero.fbx"],
//!   "dependencies": {
//!     "shaders/common.glsl": ["shaders/lit.shd"]
//!   }
//! }
//! ```
//!
//! Saving writes a temp file next to the manifest and renames it over the
//! old one, so a crash never leaves a half-written manifest active. Loading
//! never fails: a missing or corrupt manifest is empty, and a malformed
//! entry is logged and skipped.

use std::collections::BTreeMap;
use std::time::SystemTime;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::compiler::DependencyGraph;
use crate::core::ResourcePath;
use crate::fs::FileSystem;
use crate::registry::RegistryTable;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to write manifest `{path}`")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize manifest")]
    Serialize(#[from] serde_json::Error),
}

/// In-memory form of the manifest.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub resources: Vec<ResourcePath>,
    /// Dependency → dependents, in registration order.
    pub dependencies: Vec<(ResourcePath, Vec<ResourcePath>)>,
}

impl Manifest {
    /// Capture a registry table and dependency graph.
    pub fn capture(table: &RegistryTable, graph: &DependencyGraph) -> Self {
        let mut resources: Vec<_> = table.iter().map(|item| item.path.clone()).collect();
        resources.sort();

        let mut dependencies: Vec<_> = graph
            .iter()
            .map(|(dep, dependents)| (dep.clone(), dependents.to_vec()))
            .collect();
        dependencies.sort_by(|a, b| a.0.cmp(&b.0));

        Self {
            resources,
            dependencies,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.dependencies.is_empty()
    }
}

/// On-disk layout (field names are the interchange format).
#[derive(Serialize)]
struct ManifestFile<'a> {
    resources: Vec<&'a str>,
    dependencies: BTreeMap<&'a str, Vec<&'a str>>,
}

impl<'a> From<&'a Manifest> for ManifestFile<'a> {
    fn from(manifest: &'a Manifest) -> Self {
        Self {
            resources: manifest.resources.iter().map(ResourcePath::as_str).collect(),
            dependencies: manifest
                .dependencies
                .iter()
                .map(|(dep, list)| (dep.as_str(), list.iter().map(ResourcePath::as_str).collect()))
                .collect(),
        }
    }
}

/// Location of the manifest (and its temp file) on a [`FileSystem`].
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: String,
    temp: String,
}

impl ManifestStore {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let temp = format!("{path}.tmp");
        Self { path, temp }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Modification time of the active manifest (startup walk cutoff).
    pub fn modified(&self, fs: &dyn FileSystem) -> Option<SystemTime> {
        fs.modified(&self.path)
    }

    /// Write to the temp file, then replace the active manifest.
    pub fn save(&self, fs: &dyn FileSystem, manifest: &Manifest) -> Result<(), ManifestError> {
        let bytes = serde_json::to_vec_pretty(&ManifestFile::from(manifest))?;

        fs.write(&self.temp, &bytes).map_err(|source| ManifestError::Io {
            path: self.temp.clone(),
            source,
        })?;
        fs.rename(&self.temp, &self.path)
            .map_err(|source| ManifestError::Io {
                path: self.path.clone(),
                source,
            })?;

        crate::debug!(
            "manifest";
            "saved {} resources, {} dependency entries",
            manifest.resources.len(),
            manifest.dependencies.len()
        );
        Ok(())
    }

    /// Read the active manifest. Missing or corrupt → empty.
    pub fn load(&self, fs: &dyn FileSystem) -> Manifest {
        if !fs.exists(&self.path) {
            return Manifest::default();
        }

        let bytes = match fs.read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                crate::log!("manifest"; "cannot read {}: {}", self.path, e);
                return Manifest::default();
            }
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => parse(&value),
            Err(e) => {
                crate::log!("manifest"; "{} is corrupt, starting empty: {}", self.path, e);
                Manifest::default()
            }
        }
    }
}

/// Entry-by-entry parse; bad entries are logged and skipped.
fn parse(value: &Value) -> Manifest {
    let mut manifest = Manifest::default();

    match value.get("resources") {
        Some(Value::Array(entries)) => {
            for entry in entries {
                match entry.as_str().filter(|s| !s.trim().is_empty()) {
                    Some(path) => manifest.resources.push(ResourcePath::new(path)),
                    None => crate::log!("manifest"; "skipping malformed resource entry: {}", entry),
                }
            }
        }
        Some(other) => crate::log!("manifest"; "`resources` is not a list: {}", other),
        None => {}
    }

    match value.get("dependencies") {
        Some(Value::Object(entries)) => {
            for (dependency, dependents) in entries {
                let Some(list) = dependents.as_array() else {
                    crate::log!("manifest"; "skipping malformed dependency entry `{}`", dependency);
                    continue;
                };
                let dependents: Vec<_> = list
                    .iter()
                    .filter_map(|d| {
                        let path = d.as_str();
                        if path.is_none() {
                            crate::log!("manifest"; "skipping malformed dependent of `{}`: {}", dependency, d);
                        }
                        path.map(ResourcePath::new)
                    })
                    .collect();
                if !dependents.is_empty() {
                    manifest
                        .dependencies
                        .push((ResourcePath::new(dependency), dependents));
                }
            }
        }
        Some(other) => crate::log!("manifest"; "`dependencies` is not a table: {}", other),
        None => {}
    }

    manifest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ResourceType;
    use crate::fs::DiskFileSystem;
    use crate::registry::Registry;
    use tempfile::TempDir;

    fn setup() -> (TempDir, DiskFileSystem, ManifestStore) {
        let temp = TempDir::new().unwrap();
        let fs = DiskFileSystem::new(temp.path());
        let store = ManifestStore::new(".kiln/assets/_list.json");
        (temp, fs, store)
    }

    fn sample() -> (Registry, DependencyGraph) {
        let registry = Registry::new();
        registry.register_extension("png", ResourceType::new("texture")).unwrap();
        registry.register_extension("shd", ResourceType::new("shader")).unwrap();
        for path in ["textures/grass.png", "shaders/lit.shd", "shaders/unlit.shd"] {
            registry.add(ResourcePath::new(path), registry.resource_type(&ResourcePath::new(path)).unwrap());
        }

        let mut graph = DependencyGraph::new();
        graph.register(ResourcePath::new("shaders/lit.shd"), ResourcePath::new("shaders/common.glsl"));
        graph.register(ResourcePath::new("shaders/unlit.shd"), ResourcePath::new("shaders/common.glsl"));
        (registry, graph)
    }

    #[test]
    fn test_missing_manifest_is_empty() {
        let (_temp, fs, store) = setup();
        assert!(store.load(&fs).is_empty());
        assert!(store.modified(&fs).is_none());
    }

    #[test]
    fn test_round_trip() {
        let (_temp, fs, store) = setup();
        let (registry, graph) = sample();
        let manifest = Manifest::capture(&registry.lock(), &graph);

        store.save(&fs, &manifest).unwrap();
        assert!(!fs.exists(".kiln/assets/_list.json.tmp"));

        let loaded = store.load(&fs);
        assert_eq!(loaded, manifest);

        // restoring into fresh tables reproduces the same state
        let restored = Registry::new();
        restored.register_extension("png", ResourceType::new("texture")).unwrap();
        restored.register_extension("shd", ResourceType::new("shader")).unwrap();
        restored.restore(loaded.resources.iter().cloned());
        let mut restored_graph = DependencyGraph::new();
        for (dep, list) in loaded.dependencies {
            restored_graph.insert(dep, list);
        }

        assert_eq!(Manifest::capture(&restored.lock(), &restored_graph), manifest);
    }

    #[test]
    fn test_save_replaces_previous() {
        let (_temp, fs, store) = setup();
        let (registry, graph) = sample();
        store.save(&fs, &Manifest::capture(&registry.lock(), &graph)).unwrap();
        store.save(&fs, &Manifest::default()).unwrap();

        assert!(store.load(&fs).is_empty());
    }

    #[test]
    fn test_corrupt_manifest_is_empty() {
        let (_temp, fs, store) = setup();
        fs.write(store.path(), b"{ not json").unwrap();
        assert!(store.load(&fs).is_empty());
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let (_temp, fs, store) = setup();
        let json = br#"{
            "resources": ["a.png", 42, null, "b.png"],
            "dependencies": {
                "common.glsl": ["lit.shd", 7],
                "broken.glsl": "lit.shd"
            }
        }"#;
        fs.write(store.path(), json).unwrap();

        let manifest = store.load(&fs);
        assert_eq!(manifest.resources, vec![ResourcePath::new("a.png"), ResourcePath::new("b.png")]);
        assert_eq!(
            manifest.dependencies,
            vec![(ResourcePath::new("common.glsl"), vec![ResourcePath::new("lit.shd")])]
        );
    }

    #[test]
    fn test_file_format() {
        let (_temp, fs, store) = setup();
        let (registry, graph) = sample();
        store.save(&fs, &Manifest::capture(&registry.lock(), &graph)).unwrap();

        let value: Value = serde_json::from_slice(&fs.read(store.path()).unwrap()).unwrap();
        assert_eq!(value["resources"][0], "shaders/lit.shd");
        assert_eq!(
            value["dependencies"]["shaders/common.glsl"],
            serde_json::json!(["shaders/lit.shd", "shaders/unlit.shd"])
        );
    }
}
