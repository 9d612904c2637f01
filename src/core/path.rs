//! Normalized resource paths.
//!
//! A resource path is a `/`-separated string relative to the project root.
//! A sub-resource (a named unit inside one source file) is written as
//! `<subresource>:<file>`, e.g. `walk.ani:models/hero.fbx`:
//! - the part before `:` decides the resource type
//! - the part after `:` is the file on disk
//!
//! Plain paths are their own sub-resource and their own file.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::utils::hash;

/// Separator between a sub-resource name and its file.
pub const SUBRESOURCE_SEPARATOR: char = ':';

/// Normalized path plus its precomputed hash.
///
/// Identity is the full path string. The hash only accelerates map lookups,
/// so two paths that collide on the hash are still distinct keys.
#[derive(Clone)]
pub struct ResourcePath {
    path: Arc<str>,
    hash: u64,
}

impl ResourcePath {
    /// Normalize and hash a raw path.
    pub fn new(path: impl AsRef<str>) -> Self {
        let path = normalize(path.as_ref());
        let hash = hash::compute(path.as_bytes());
        Self {
            path: path.into(),
            hash,
        }
    }

    /// Build a path with a forced hash (collision tests).
    #[cfg(test)]
    pub(crate) fn with_hash(path: &str, hash: u64) -> Self {
        Self {
            path: normalize(path).into(),
            hash,
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Precomputed hash of the normalized path.
    #[inline]
    pub fn path_hash(&self) -> u64 {
        self.hash
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Whether this path names a sub-resource (`<subresource>:<file>`).
    pub fn is_subresource(&self) -> bool {
        self.path.contains(SUBRESOURCE_SEPARATOR)
    }

    /// Portion before the separator (the whole path if there is none).
    pub fn subresource(&self) -> &str {
        self.path
            .split_once(SUBRESOURCE_SEPARATOR)
            .map_or(self.as_str(), |(sub, _)| sub)
    }

    /// Underlying file (the whole path if there is no separator).
    pub fn file(&self) -> &str {
        self.path
            .split_once(SUBRESOURCE_SEPARATOR)
            .map_or(self.as_str(), |(_, file)| file)
    }

    /// Underlying file as its own resource path.
    pub fn file_path(&self) -> ResourcePath {
        if self.is_subresource() {
            ResourcePath::new(self.file())
        } else {
            self.clone()
        }
    }

    /// Lowercase extension of the sub-resource part (drives type lookup).
    pub fn extension(&self) -> Option<String> {
        extension_of(self.subresource())
    }

    /// Lowercase extension of the underlying file (drives plugin lookup).
    pub fn file_extension(&self) -> Option<String> {
        extension_of(self.file())
    }

    /// Sibling of the underlying file with the same base name and another
    /// extension: `textures/grass.png` + `meta` → `textures/grass.meta`.
    pub fn with_extension(&self, ext: &str) -> ResourcePath {
        let file = self.file();
        let (dir, name) = file.rsplit_once('/').map_or(("", file), |(d, n)| (d, n));
        let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
        if dir.is_empty() {
            ResourcePath::new(format!("{stem}.{ext}"))
        } else {
            ResourcePath::new(format!("{dir}/{stem}.{ext}"))
        }
    }

    /// Whether the path lies inside `dir` (or is `dir` itself).
    pub fn is_within(&self, dir: &str) -> bool {
        let dir = dir.trim_end_matches('/');
        if dir.is_empty() {
            return true;
        }
        self.path
            .strip_prefix(dir)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }
}

/// Lowercase extension of the last path segment, if any.
pub fn extension_of(path: &str) -> Option<String> {
    let name = path.rsplit('/').next()?;
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Normalize separators and drop empty / `.` segments on both sides of the
/// sub-resource separator.
fn normalize(raw: &str) -> String {
    match raw.trim().split_once(SUBRESOURCE_SEPARATOR) {
        Some((sub, file)) => format!(
            "{}{SUBRESOURCE_SEPARATOR}{}",
            normalize_segments(sub),
            normalize_segments(file)
        ),
        None => normalize_segments(raw.trim()),
    }
}

fn normalize_segments(raw: &str) -> String {
    raw.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

impl PartialEq for ResourcePath {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.path == other.path
    }
}

impl Eq for ResourcePath {}

impl Hash for ResourcePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialOrd for ResourcePath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ResourcePath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.path.cmp(&other.path)
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl fmt::Debug for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourcePath({:?})", &*self.path)
    }
}

impl From<&str> for ResourcePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for ResourcePath {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

impl AsRef<str> for ResourcePath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_separators() {
        assert_eq!(ResourcePath::new("textures\\grass.png").as_str(), "textures/grass.png");
        assert_eq!(ResourcePath::new("/textures//grass.png").as_str(), "textures/grass.png");
        assert_eq!(ResourcePath::new("./textures/./grass.png").as_str(), "textures/grass.png");
    }

    #[test]
    fn test_normalize_subresource() {
        let path = ResourcePath::new("walk.ani:/models\\hero.fbx");
        assert_eq!(path.as_str(), "walk.ani:models/hero.fbx");
        assert!(path.is_subresource());
        assert_eq!(path.subresource(), "walk.ani");
        assert_eq!(path.file(), "models/hero.fbx");
    }

    #[test]
    fn test_plain_path_is_its_own_file() {
        let path = ResourcePath::new("textures/grass.png");
        assert!(!path.is_subresource());
        assert_eq!(path.subresource(), "textures/grass.png");
        assert_eq!(path.file(), "textures/grass.png");
        assert_eq!(path.file_path(), path);
    }

    #[test]
    fn test_extensions() {
        let path = ResourcePath::new("Walk.ANI:models/hero.FBX");
        assert_eq!(path.extension().as_deref(), Some("ani"));
        assert_eq!(path.file_extension().as_deref(), Some("fbx"));
        assert_eq!(extension_of("models/noext"), None);
        assert_eq!(extension_of("models.d/noext"), None);
        assert_eq!(extension_of("trailing."), None);
    }

    #[test]
    fn test_with_extension() {
        let path = ResourcePath::new("textures/grass.png");
        assert_eq!(path.with_extension("meta").as_str(), "textures/grass.meta");

        let root = ResourcePath::new("grass.png");
        assert_eq!(root.with_extension("meta").as_str(), "grass.meta");

        let sub = ResourcePath::new("walk.ani:models/hero.fbx");
        assert_eq!(sub.with_extension("meta").as_str(), "models/hero.meta");
    }

    #[test]
    fn test_is_within() {
        let path = ResourcePath::new(".kiln/assets/00ff.res");
        assert!(path.is_within(".kiln/assets"));
        assert!(path.is_within(".kiln"));
        assert!(!path.is_within(".kil"));
        assert!(!ResourcePath::new(".kilnx/a.res").is_within(".kiln"));
    }

    #[test]
    fn test_equality_uses_full_path() {
        let a = ResourcePath::with_hash("a.png", 7);
        let b = ResourcePath::with_hash("b.png", 7);
        assert_ne!(a, b);
        assert_eq!(a, ResourcePath::with_hash("a.png", 7));
    }

    #[test]
    fn test_same_path_same_hash() {
        assert_eq!(
            ResourcePath::new("a\\b.png").path_hash(),
            ResourcePath::new("a/b.png").path_hash()
        );
    }
}
