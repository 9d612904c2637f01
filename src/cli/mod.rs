//! Command-line interface module.

mod args;
pub mod build;
pub mod list;
pub mod scan;
pub mod watch;

pub use args::{Cli, Commands};

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::compiler::{AssetCompiler, CopyPlugin, Plugins};
use crate::config::PipelineConfig;
use crate::fs::DiskFileSystem;
use crate::loader::ResourceLoader;

/// Compiler over the project root with the configured types registered and
/// the pass-through plugin serving every configured extension.
pub fn open_compiler(
    config: &PipelineConfig,
    loader: Arc<dyn ResourceLoader>,
) -> Result<AssetCompiler> {
    let plugins = Arc::new(Plugins::new());
    plugins.add(Arc::new(CopyPlugin), &config.extensions());

    let fs = Arc::new(DiskFileSystem::new(&config.root));
    let compiler = AssetCompiler::new(config.compiler_options(), fs, loader, plugins)
        .context("failed to start compiler")?;

    for ty in &config.types {
        for ext in &ty.extensions {
            compiler
                .register_extension(ext, ty.name.as_str())
                .with_context(|| format!("invalid [[types]] entry `{}`", ty.name))?;
        }
    }
    Ok(compiler)
}
