//! Per-extension compiler plugins.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::CompileContext;
use crate::core::{ResourceItem, ResourcePath, extension_of};
use crate::registry::Registry;

/// A format converter for one or more file extensions.
pub trait AssetPlugin: Send + Sync {
    /// Compile `ctx.source()` and return the artifact bytes.
    ///
    /// Extra artifacts (sub-resources) can be written through
    /// [`CompileContext::write_compiled_resource`].
    fn compile(&self, ctx: &CompileContext<'_>) -> anyhow::Result<Vec<u8>>;

    /// Resources contained in the source file `path`.
    ///
    /// The default registers the file itself when its extension has a
    /// registered type.
    fn enumerate_subresources(&self, registry: &Registry, path: &ResourcePath) -> Vec<ResourceItem> {
        registry
            .resource_type(path)
            .map(|kind| vec![ResourceItem::new(path.clone(), kind)])
            .unwrap_or_default()
    }

    /// Short name for logs.
    fn name(&self) -> &str {
        "plugin"
    }
}

/// Pass-through plugin: the artifact is the source file unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct CopyPlugin;

impl AssetPlugin for CopyPlugin {
    fn compile(&self, ctx: &CompileContext<'_>) -> anyhow::Result<Vec<u8>> {
        ctx.read_source()
    }

    fn name(&self) -> &str {
        "copy"
    }
}

/// Extension → plugin table.
///
/// Mutated rarely (plugin load/unload), read on every compile dispatch and
/// every discovered file.
#[derive(Default)]
pub struct Plugins {
    table: RwLock<FxHashMap<String, Arc<dyn AssetPlugin>>>,
}

impl Plugins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `extensions` to `plugin`. A later registration for the same
    /// extension replaces the earlier one.
    pub fn add(&self, plugin: Arc<dyn AssetPlugin>, extensions: &[&str]) {
        let mut table = self.table.write();
        for ext in extensions {
            let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
            if ext.is_empty() {
                continue;
            }
            if let Some(previous) = table.insert(ext.clone(), plugin.clone())
                && !same_plugin(&previous, &plugin)
            {
                crate::debug!("plugin"; "`{}` moved from {} to {}", ext, previous.name(), plugin.name());
            }
        }
    }

    /// Remove every extension routed to `plugin`. Returns how many were
    /// removed.
    pub fn remove(&self, plugin: &Arc<dyn AssetPlugin>) -> usize {
        let mut table = self.table.write();
        let before = table.len();
        table.retain(|_, p| !same_plugin(p, plugin));
        before - table.len()
    }

    /// Plugin registered for a bare extension (case-insensitive).
    pub fn get(&self, ext: &str) -> Option<Arc<dyn AssetPlugin>> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        self.table.read().get(&ext).cloned()
    }

    /// Plugin for the underlying file of `path`.
    pub fn for_path(&self, path: &ResourcePath) -> Option<Arc<dyn AssetPlugin>> {
        let ext = extension_of(path.file())?;
        self.table.read().get(&ext).cloned()
    }

    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Identity by data pointer (vtable pointers may differ across codegen units).
fn same_plugin(a: &Arc<dyn AssetPlugin>, b: &Arc<dyn AssetPlugin>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ResourceType;

    struct Named(&'static str);

    impl AssetPlugin for Named {
        fn compile(&self, _ctx: &CompileContext<'_>) -> anyhow::Result<Vec<u8>> {
            Ok(self.0.as_bytes().to_vec())
        }

        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let plugins = Plugins::new();
        let plugin: Arc<dyn AssetPlugin> = Arc::new(Named("tex"));
        plugins.add(plugin, &["PNG", ".tga"]);

        assert!(plugins.get("png").is_some());
        assert!(plugins.get("TGA").is_some());
        assert!(plugins.for_path(&ResourcePath::new("textures/grass.PNG")).is_some());
        assert!(plugins.for_path(&ResourcePath::new("notes.txt")).is_none());
    }

    #[test]
    fn test_for_path_uses_file_part() {
        let plugins = Plugins::new();
        plugins.add(Arc::new(Named("fbx")), &["fbx"]);
        let path = ResourcePath::new("walk.ani:models/hero.fbx");
        assert_eq!(plugins.for_path(&path).map(|p| p.name().to_string()).as_deref(), Some("fbx"));
    }

    #[test]
    fn test_remove_only_drops_own_extensions() {
        let plugins = Plugins::new();
        let tex: Arc<dyn AssetPlugin> = Arc::new(Named("tex"));
        let mesh: Arc<dyn AssetPlugin> = Arc::new(Named("mesh"));
        plugins.add(tex.clone(), &["png", "tga"]);
        plugins.add(mesh.clone(), &["fbx"]);

        assert_eq!(plugins.remove(&tex), 2);
        assert_eq!(plugins.len(), 1);
        assert!(plugins.get("fbx").is_some());
        assert_eq!(plugins.remove(&tex), 0);
    }

    #[test]
    fn test_default_enumeration_uses_type_table() {
        let registry = Registry::new();
        registry.register_extension("png", ResourceType::new("texture")).unwrap();
        let plugin = Named("tex");

        let items = plugin.enumerate_subresources(&registry, &ResourcePath::new("a.png"));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, ResourceType::new("texture"));
        assert!(plugin.enumerate_subresources(&registry, &ResourcePath::new("a.bmp")).is_empty());
    }
}
