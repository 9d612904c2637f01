//! Filesystem collaborator.
//!
//! The compiler never touches `std::fs` directly: every access goes through a
//! [`FileSystem`] handed in at construction. Paths are resource paths
//! relative to the filesystem's base directory.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use jwalk::WalkDir;

use crate::core::ResourcePath;

const IGNORED_FILES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// A file found by [`FileSystem::walk`].
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: ResourcePath,
    pub modified: Option<SystemTime>,
}

/// Base-relative file access used by the compiler.
pub trait FileSystem: Send + Sync {
    /// Whether `path` names an existing regular file.
    fn exists(&self, path: &str) -> bool;

    /// Modification time, `None` if missing or unreadable.
    fn modified(&self, path: &str) -> Option<SystemTime>;

    fn read(&self, path: &str) -> io::Result<Vec<u8>>;

    /// Write `data`, creating parent directories as needed.
    fn write(&self, path: &str, data: &[u8]) -> io::Result<()>;

    /// Copy `from` to `to`, creating parent directories as needed.
    fn copy(&self, from: &str, to: &str) -> io::Result<()>;

    /// Rename, replacing `to` if it exists.
    fn rename(&self, from: &str, to: &str) -> io::Result<()>;

    fn remove(&self, path: &str) -> io::Result<()>;

    fn create_dir_all(&self, path: &str) -> io::Result<()>;

    /// Every regular file under the base directory, skipping hidden entries
    /// (names starting with `.`) and their contents.
    fn walk(&self) -> Vec<FileEntry>;
}

/// [`FileSystem`] over the local disk.
#[derive(Debug, Clone)]
pub struct DiskFileSystem {
    root: PathBuf,
}

impl DiskFileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute path of a base-relative path.
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    fn ensure_parent(path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
            _ => Ok(()),
        }
    }

    /// Base-relative form of an absolute path found under the root.
    fn relative(&self, path: &Path) -> Option<ResourcePath> {
        let rel = path.strip_prefix(&self.root).ok()?;
        Some(ResourcePath::new(rel.to_string_lossy()))
    }
}

impl FileSystem for DiskFileSystem {
    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn modified(&self, path: &str) -> Option<SystemTime> {
        self.resolve(path).metadata().and_then(|m| m.modified()).ok()
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.resolve(path))
    }

    fn write(&self, path: &str, data: &[u8]) -> io::Result<()> {
        let path = self.resolve(path);
        Self::ensure_parent(&path)?;
        std::fs::write(path, data)
    }

    fn copy(&self, from: &str, to: &str) -> io::Result<()> {
        let to = self.resolve(to);
        Self::ensure_parent(&to)?;
        std::fs::copy(self.resolve(from), to).map(|_| ())
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        std::fs::rename(self.resolve(from), self.resolve(to))
    }

    fn remove(&self, path: &str) -> io::Result<()> {
        std::fs::remove_file(self.resolve(path))
    }

    fn create_dir_all(&self, path: &str) -> io::Result<()> {
        std::fs::create_dir_all(self.resolve(path))
    }

    fn walk(&self) -> Vec<FileEntry> {
        WalkDir::new(&self.root)
            .skip_hidden(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                let name = e.file_name().to_str().unwrap_or_default();
                !IGNORED_FILES.contains(&name)
            })
            .filter_map(|e| {
                let path = self.relative(&e.path())?;
                let modified = e.metadata().ok().and_then(|m| m.modified().ok());
                Some(FileEntry { path, modified })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // tempfile's default `.tmp` prefix would make the root itself hidden
    fn temp_dir() -> TempDir {
        tempfile::Builder::new().prefix("kiln-fs").tempdir().unwrap()
    }

    #[test]
    fn test_write_creates_parents() {
        let temp = temp_dir();
        let fs = DiskFileSystem::new(temp.path());

        fs.write("a/b/c.bin", b"data").unwrap();
        assert!(fs.exists("a/b/c.bin"));
        assert_eq!(fs.read("a/b/c.bin").unwrap(), b"data");
        assert!(fs.modified("a/b/c.bin").is_some());
        assert!(fs.modified("a/b/missing.bin").is_none());
    }

    #[test]
    fn test_exists_is_false_for_dirs() {
        let temp = temp_dir();
        let fs = DiskFileSystem::new(temp.path());
        fs.create_dir_all("dir").unwrap();
        assert!(!fs.exists("dir"));
    }

    #[test]
    fn test_rename_replaces_target() {
        let temp = temp_dir();
        let fs = DiskFileSystem::new(temp.path());
        fs.write("old", b"old").unwrap();
        fs.write("new_tmp", b"new").unwrap();

        fs.rename("new_tmp", "old").unwrap();
        assert_eq!(fs.read("old").unwrap(), b"new");
        assert!(!fs.exists("new_tmp"));
    }

    #[test]
    fn test_walk_skips_hidden() {
        let temp = temp_dir();
        let fs = DiskFileSystem::new(temp.path());
        fs.write("textures/grass.png", b"png").unwrap();
        fs.write(".kiln/assets/0001.res", b"res").unwrap();
        fs.write("textures/.hidden.png", b"png").unwrap();

        let paths: Vec<_> = fs.walk().into_iter().map(|e| e.path).collect();
        assert_eq!(paths, vec![ResourcePath::new("textures/grass.png")]);
    }
}
