//! Resource-loading collaborator.
//!
//! The compiler does not own loaded resources. When a file changes it asks
//! the loader to reload every resource rooted at that file; the loader then
//! comes back through [`crate::compiler::AssetCompiler::on_before_load`] like
//! any other load.

use parking_lot::Mutex;

use crate::core::ResourcePath;

/// Loading subsystem as seen by the compiler.
pub trait ResourceLoader: Send + Sync {
    /// Force a reload of `path` if it is currently loaded.
    fn reload(&self, path: &ResourcePath);
}

/// Loader that ignores reload requests (batch tools, tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLoader;

impl ResourceLoader for NullLoader {
    fn reload(&self, _path: &ResourcePath) {}
}

/// Loader that records reload requests for the caller to act on later.
///
/// The watch loop uses it to turn reloads back into load requests on the
/// main thread.
#[derive(Debug, Default)]
pub struct QueuedLoader {
    requests: Mutex<Vec<ResourcePath>>,
}

impl QueuedLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every recorded request, oldest first, without duplicates.
    pub fn take(&self) -> Vec<ResourcePath> {
        let requests = std::mem::take(&mut *self.requests.lock());
        let mut unique: Vec<ResourcePath> = Vec::with_capacity(requests.len());
        for path in requests {
            if !unique.contains(&path) {
                unique.push(path);
            }
        }
        unique
    }
}

impl ResourceLoader for QueuedLoader {
    fn reload(&self, path: &ResourcePath) {
        self.requests.lock().push(path.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queued_loader_dedups_in_order() {
        let loader = QueuedLoader::new();
        loader.reload(&ResourcePath::new("b.png"));
        loader.reload(&ResourcePath::new("a.png"));
        loader.reload(&ResourcePath::new("b.png"));

        assert_eq!(
            loader.take(),
            vec![ResourcePath::new("b.png"), ResourcePath::new("a.png")]
        );
        assert!(loader.take().is_empty());
    }
}
