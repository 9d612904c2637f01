//! `kiln build`: compile every stale resource once.
//!
//! Each known resource goes through the load hook exactly like an engine
//! load would; the deferred ones are drained until the queue is idle.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};

use crate::compiler::{AssetCompiler, CompileOutcome, LoadAction, LoadTicket};
use crate::config::PipelineConfig;
use crate::core::{ResourcePath, is_shutdown};
use crate::loader::NullLoader;
use crate::log;
use crate::logger::BatchLine;

/// Poll interval of the drain loop.
pub(super) const TICK: Duration = Duration::from_millis(20);

pub fn run_build(config: &PipelineConfig) -> Result<()> {
    let compiler = super::open_compiler(config, Arc::new(NullLoader))?;
    super::scan::scan(&compiler);

    let tickets = request_all(&compiler);
    if tickets.is_empty() {
        log!("build"; "everything is up to date");
        compiler.shutdown()?;
        return Ok(());
    }

    let requested = tickets.len();
    let compiled = drain(&compiler);
    compiler.shutdown()?;

    let failed: Vec<(ResourcePath, String)> = tickets
        .into_iter()
        .filter_map(|ticket| match ticket.try_outcome() {
            Some(CompileOutcome::Failed(reason)) => Some((ticket.resource().clone(), reason)),
            _ => None,
        })
        .collect();

    if failed.is_empty() {
        log!("build"; "compiled {} file(s)", compiled);
        return Ok(());
    }
    for (resource, reason) in &failed {
        log!("error"; "{}: {}", resource, reason);
    }
    bail!("{} of {} resource load(s) failed", failed.len(), requested)
}

/// Pass every known resource through the load hook; keep the deferred ones.
pub(super) fn request_all(compiler: &AssetCompiler) -> Vec<LoadTicket> {
    compiler
        .resources()
        .into_iter()
        .filter_map(|item| match compiler.on_before_load(&item.path) {
            LoadAction::Immediate => None,
            LoadAction::Deferred(ticket) => Some(ticket),
        })
        .collect()
}

/// Drain completions until the queue is idle. Returns the number of jobs
/// finished.
fn drain(compiler: &AssetCompiler) -> usize {
    let line = BatchLine::new("build");
    let mut done = 0;
    loop {
        done += compiler.update().len();
        let progress = compiler.progress();
        line.show(
            done,
            done + progress.remaining,
            progress.in_progress.as_ref().map(ResourcePath::as_str),
        );
        if progress.is_idle() || is_shutdown() {
            break;
        }
        std::thread::sleep(TICK);
    }
    line.finish(done, done);
    done
}
