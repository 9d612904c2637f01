//! `kiln watch`: keep artifacts fresh while files change.
//!
//! ```text
//! FsWatcher ──batch──► on_file_changed ──reload──► QueuedLoader
//!                                                     │
//!        update() ◄── worker ◄── on_before_load ◄─────┘
//! ```
//!
//! Everything except the compile itself runs on this thread, one tick at a
//! time. Ctrl+C ends the loop and the manifest is flushed on the way out.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossbeam::channel;

use super::build::{TICK, request_all};
use crate::compiler::{AssetCompiler, CompileOutcome, Completion, LoadAction};
use crate::config::PipelineConfig;
use crate::core::is_shutdown;
use crate::loader::QueuedLoader;
use crate::log;
use crate::logger::{status_error, status_success};
use crate::watch::{FsWatcher, WatchEvent};

pub fn run_watch(config: &PipelineConfig, debounce_ms: Option<u64>) -> Result<()> {
    if !config.watch.enabled {
        log!("watch"; "disabled by [watch] enabled = false, building once");
        return super::build::run_build(config);
    }

    // watcher first: changes made during the scan are buffered
    let debounce = Duration::from_millis(debounce_ms.unwrap_or(config.watch.debounce_ms));
    let (watcher, batches) = FsWatcher::spawn(&config.root, debounce)?;

    let loader = Arc::new(QueuedLoader::new());
    let compiler = super::open_compiler(config, loader.clone())?;
    super::scan::scan(&compiler);
    let initial = request_all(&compiler).len();
    if initial > 0 {
        log!("watch"; "{} stale resource(s) queued", initial);
    }
    log!("watch"; "watching {} (Ctrl+C to stop)", config.root.display());

    while !is_shutdown() {
        channel::select! {
            recv(batches) -> batch => match batch {
                Ok(events) => apply_changes(&compiler, &events),
                Err(_) => break,
            },
            default(TICK) => {}
        }

        for path in loader.take() {
            if let LoadAction::Deferred(ticket) = compiler.on_before_load(&path) {
                crate::debug!("watch"; "reload of {} deferred", ticket.resource());
            }
        }
        report(&compiler.update());
    }

    drop(watcher);
    compiler.shutdown()?;
    Ok(())
}

fn apply_changes(compiler: &AssetCompiler, events: &[WatchEvent]) {
    for event in events {
        let change = compiler.on_file_changed(&event.path);
        if change.is_empty() {
            continue;
        }
        crate::debug!(
            "watch";
            "{} {}: {} reloaded, {} added, {} cascaded",
            event.kind.label(),
            event.path,
            change.reloaded.len(),
            change.added,
            change.cascaded.len()
        );
    }
}

fn report(completions: &[Completion]) {
    for completion in completions {
        match &completion.outcome {
            CompileOutcome::Compiled => {
                status_success(&format!("compiled: {}", completion.path));
            }
            CompileOutcome::Failed(reason) => {
                status_error(&format!("failed: {}", completion.path), reason);
            }
        }
    }
}
