//! What a plugin can reach while compiling one file.

use anyhow::Context;

use super::Shared;
use crate::core::ResourcePath;

/// Per-job view of the compiler handed to [`super::AssetPlugin::compile`].
pub struct CompileContext<'a> {
    shared: &'a Shared,
    source: &'a ResourcePath,
}

impl<'a> CompileContext<'a> {
    pub(crate) fn new(shared: &'a Shared, source: &'a ResourcePath) -> Self {
        Self { shared, source }
    }

    /// File being compiled.
    pub fn source(&self) -> &ResourcePath {
        self.source
    }

    pub fn read_source(&self) -> anyhow::Result<Vec<u8>> {
        self.read(self.source.file())
    }

    /// Read any file relative to the project root.
    pub fn read(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        self.shared
            .fs
            .read(path)
            .with_context(|| format!("failed to read `{path}`"))
    }

    /// Sidecar metadata of the source file, if any.
    pub fn meta(&self) -> anyhow::Result<Option<toml::Table>> {
        Ok(self.shared.meta(self.source)?)
    }

    /// Record that the source was compiled from `dependency`: a change to
    /// `dependency` will invalidate and reload it.
    pub fn register_dependency(&self, dependency: impl Into<ResourcePath>) -> bool {
        self.shared
            .register_dependency(self.source.clone(), dependency.into())
    }

    /// Write an extra artifact for `locator` (typically a sub-resource of the
    /// source).
    pub fn write_compiled_resource(&self, locator: &ResourcePath, data: &[u8]) -> anyhow::Result<()> {
        Ok(self.shared.write_compiled_resource(locator, data)?)
    }

    /// Copy `src` unchanged to its artifact location.
    pub fn copy_compile(&self, src: &ResourcePath) -> anyhow::Result<()> {
        Ok(self.shared.copy_compile(src)?)
    }
}
