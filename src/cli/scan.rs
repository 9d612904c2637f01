//! `kiln scan`: reconcile the manifest with the project tree.

use std::sync::Arc;

use anyhow::Result;

use crate::compiler::{AssetCompiler, ScanSummary};
use crate::config::PipelineConfig;
use crate::loader::NullLoader;
use crate::log;

pub fn run_scan(config: &PipelineConfig) -> Result<()> {
    let compiler = super::open_compiler(config, Arc::new(NullLoader))?;
    scan(&compiler);
    compiler.shutdown()?;
    Ok(())
}

/// Run startup reconciliation and log the counts.
pub(super) fn scan(compiler: &AssetCompiler) -> ScanSummary {
    let summary = compiler.initialize();
    log!(
        "scan";
        "{} files, {} resources ({} restored, {} discovered, {} dependency entries)",
        summary.files,
        compiler.lock_resources().len(),
        summary.restored,
        summary.discovered,
        summary.dependencies
    );
    summary
}
