//! Resource types and registry items.

use std::fmt;
use std::sync::Arc;

use super::ResourcePath;

/// Engine-side type tag of a resource (e.g. `texture`, `mesh`).
///
/// Resolved from a registered file-extension table; unknown extensions have
/// no type and are never registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceType(Arc<str>);

impl ResourceType {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A known source resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceItem {
    pub path: ResourcePath,
    pub kind: ResourceType,
}

impl ResourceItem {
    pub fn new(path: impl Into<ResourcePath>, kind: impl Into<ResourceType>) -> Self {
        Self {
            path: path.into(),
            kind: kind.into(),
        }
    }
}
