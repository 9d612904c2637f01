//! Compiled-artifact locations.
//!
//! Artifacts live flat in one output directory, named by the hash of the
//! normalized resource path: `<output>/<hash>.<ext>`. Any consumer can
//! recompute a locator from the path alone.

use crate::core::ResourcePath;
use crate::utils::hash;

#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    output_dir: String,
    extension: String,
}

impl ArtifactLayout {
    pub fn new(output_dir: impl AsRef<str>, extension: impl AsRef<str>) -> Self {
        let output_dir = ResourcePath::new(output_dir).as_str().to_string();
        let extension = extension.as_ref().trim_start_matches('.').to_string();
        Self {
            output_dir,
            extension,
        }
    }

    pub fn output_dir(&self) -> &str {
        &self.output_dir
    }

    /// Artifact path of `resource`.
    pub fn locator(&self, resource: &ResourcePath) -> String {
        let key = hash::to_key(resource.path_hash());
        format!("{}/{}.{}", self.output_dir, key, self.extension)
    }

    /// Whether `path` lies in the artifact output area.
    pub fn contains(&self, path: &ResourcePath) -> bool {
        path.is_within(&self.output_dir)
    }

    /// Whether `path` belongs to the tool rather than the project. When the
    /// output area sits under a hidden top-level directory (e.g. `.kiln` for
    /// `.kiln/assets`) that whole directory counts; otherwise only the output
    /// area itself does, so sources next to it stay visible.
    pub fn is_internal(&self, path: &ResourcePath) -> bool {
        match self.output_dir.split('/').next() {
            Some(top) if top.len() > 1 && top.starts_with('.') => path.is_within(top),
            _ => self.contains(path),
        }
    }
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self::new(".kiln/assets", "res")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_is_deterministic() {
        let layout = ArtifactLayout::default();
        let a = layout.locator(&ResourcePath::new("textures/grass.png"));
        let b = layout.locator(&ResourcePath::new("textures\\grass.png"));
        assert_eq!(a, b);
        assert!(a.starts_with(".kiln/assets/"));
        assert!(a.ends_with(".res"));
        assert_eq!(a.len(), ".kiln/assets/".len() + 16 + ".res".len());
    }

    #[test]
    fn test_subresources_get_own_locator() {
        let layout = ArtifactLayout::default();
        assert_ne!(
            layout.locator(&ResourcePath::new("walk.ani:models/hero.fbx")),
            layout.locator(&ResourcePath::new("models/hero.fbx"))
        );
    }

    #[test]
    fn test_contains_and_internal() {
        let layout = ArtifactLayout::new("./.kiln/assets/", ".res");
        assert_eq!(layout.output_dir(), ".kiln/assets");

        let artifact = ResourcePath::new(layout.locator(&ResourcePath::new("a.png")));
        assert!(layout.contains(&artifact));
        assert!(layout.is_internal(&artifact));
        assert!(layout.is_internal(&ResourcePath::new(".kiln/assets/_list.json")));
        assert!(!layout.contains(&ResourcePath::new("textures/a.png")));
        assert!(!layout.is_internal(&ResourcePath::new("textures/a.png")));
    }

    #[test]
    fn test_visible_output_dir_only_claims_itself() {
        let layout = ArtifactLayout::new("assets/compiled", "res");
        let artifact = ResourcePath::new(layout.locator(&ResourcePath::new("a.png")));
        assert!(layout.is_internal(&artifact));
        assert!(layout.is_internal(&ResourcePath::new("assets/compiled/_list.json")));
        assert!(!layout.is_internal(&ResourcePath::new("assets/textures/a.png")));
        assert!(!layout.is_internal(&ResourcePath::new("assets/compiled.png")));
    }
}
