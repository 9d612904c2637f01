//! Dependency tracking for cascading invalidation.
//!
//! Maps a dependency file to the ordered list of resources that were compiled
//! "from" it. Edges are only added by plugins (through
//! [`super::CompileContext::register_dependency`]); nothing is derived
//! automatically.
//!
//! The graph is two-level on purpose: a change to a dependency invalidates
//! its direct dependents, never their dependents.

use rustc_hash::FxHashMap;

use crate::core::ResourcePath;

/// Dependency → dependents ("included from") edges.
///
/// # Invariants
/// - A dependent appears at most once per dependency list
/// - Lists are never empty (the entry is dropped instead)
/// - Self-references are excluded
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    edges: FxHashMap<ResourcePath, Vec<ResourcePath>>,
}

impl DependencyGraph {
    /// Create an empty dependency graph.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `consumer` was compiled from `dependency`.
    ///
    /// Returns `false` if the edge already existed (or is a self-reference).
    pub fn register(&mut self, consumer: ResourcePath, dependency: ResourcePath) -> bool {
        if consumer == dependency {
            return false;
        }
        let dependents = self.edges.entry(dependency).or_default();
        if dependents.contains(&consumer) {
            return false;
        }
        dependents.push(consumer);
        true
    }

    /// Resources compiled from `dependency`, in registration order.
    pub fn dependents(&self, dependency: &ResourcePath) -> &[ResourcePath] {
        self.edges.get(dependency).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Remove `dependency`'s entry and hand back its dependents.
    pub fn take_dependents(&mut self, dependency: &ResourcePath) -> Vec<ResourcePath> {
        self.edges.remove(dependency).unwrap_or_default()
    }

    /// Scrub `path` from every dependency list. O(total edges).
    ///
    /// Returns the number of edges removed.
    pub fn remove_dependent(&mut self, path: &ResourcePath) -> usize {
        let mut removed = 0;
        self.edges.retain(|_, dependents| {
            let before = dependents.len();
            dependents.retain(|p| p != path);
            removed += before - dependents.len();
            !dependents.is_empty()
        });
        removed
    }

    /// Replace the list for `dependency` (manifest restore).
    pub fn insert(&mut self, dependency: ResourcePath, dependents: Vec<ResourcePath>) {
        let mut unique: Vec<ResourcePath> = Vec::with_capacity(dependents.len());
        for dependent in dependents {
            if dependent != dependency && !unique.contains(&dependent) {
                unique.push(dependent);
            }
        }
        if unique.is_empty() {
            self.edges.remove(&dependency);
        } else {
            self.edges.insert(dependency, unique);
        }
    }

    /// Iterate all `(dependency, dependents)` entries (no ordering guarantee).
    pub fn iter(&self) -> impl Iterator<Item = (&ResourcePath, &[ResourcePath])> {
        self.edges.iter().map(|(dep, list)| (dep, list.as_slice()))
    }

    /// Number of dependency entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
