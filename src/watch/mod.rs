//! Filesystem watcher feeding the change-notification bridge.
//!
//! ```text
//! notify → Debouncer (timing, dedup) → Vec<WatchEvent> → channel
//! ```
//!
//! The watcher starts before the caller's initial scan: events raised during
//! the scan are buffered, not lost. The receiving side decides what to do
//! with each batch, usually [`crate::compiler::AssetCompiler::on_file_changed`].

mod debouncer;

pub use debouncer::ChangeKind;

use std::path::{Component, Path, PathBuf};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam::channel::{self, Receiver, Sender};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use crate::core::ResourcePath;
use debouncer::Debouncer;

/// One debounced change, relative to the watched root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: ResourcePath,
    pub kind: ChangeKind,
}

/// Running watcher. Dropping it stops the debounce thread.
pub struct FsWatcher {
    _watcher: RecommendedWatcher,
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl FsWatcher {
    /// Watch `root` recursively; debounced batches arrive on the returned
    /// receiver.
    pub fn spawn(root: &Path, debounce: Duration) -> Result<(Self, Receiver<Vec<WatchEvent>>)> {
        let root = root
            .canonicalize()
            .with_context(|| format!("cannot watch `{}`", root.display()))?;

        let (notify_tx, notify_rx) = channel::unbounded();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })
        .context("failed to create file watcher")?;
        watcher
            .watch(&root, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch `{}`", root.display()))?;

        let (batch_tx, batch_rx) = channel::unbounded();
        let (stop_tx, stop_rx) = channel::bounded(1);
        let handle = std::thread::Builder::new()
            .name("kiln-watch".into())
            .spawn(move || run(root, Debouncer::new(debounce), notify_rx, stop_rx, batch_tx))
            .context("failed to spawn watcher thread")?;

        let watcher = Self {
            _watcher: watcher,
            stop_tx,
            handle: Some(handle),
        };
        Ok((watcher, batch_rx))
    }
}

impl Drop for FsWatcher {
    fn drop(&mut self) {
        let _ = self.stop_tx.try_send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(
    root: PathBuf,
    mut debouncer: Debouncer,
    notify_rx: Receiver<notify::Result<notify::Event>>,
    stop_rx: Receiver<()>,
    batch_tx: Sender<Vec<WatchEvent>>,
) {
    loop {
        channel::select! {
            recv(notify_rx) -> msg => match msg {
                Ok(Ok(event)) => debouncer.add_event(&event),
                Ok(Err(e)) => crate::log!("watch"; "notify error: {}", e),
                Err(_) => break,
            },
            recv(stop_rx) -> _ => break,
            default(debouncer.sleep_duration()) => {}
        }

        let Some(changes) = debouncer.take_if_ready() else {
            continue;
        };
        let batch: Vec<WatchEvent> = changes
            .into_iter()
            .filter_map(|(path, kind)| {
                let path = relative_to(&root, &path)?;
                crate::debug!("watch"; "{}: {}", kind.label(), path);
                Some(WatchEvent { path, kind })
            })
            .collect();
        if !batch.is_empty() && batch_tx.send(batch).is_err() {
            break;
        }
    }
    crate::debug!("watch"; "watcher stopped");
}

/// Root-relative resource path, `None` outside the root or under a hidden
/// directory.
fn relative_to(root: &Path, path: &Path) -> Option<ResourcePath> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        let Component::Normal(part) = component else {
            return None;
        };
        let part = part.to_str()?;
        if part.starts_with('.') {
            return None;
        }
        parts.push(part);
    }
    (!parts.is_empty()).then(|| ResourcePath::new(parts.join("/")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_to() {
        let root = Path::new("/game");
        assert_eq!(
            relative_to(root, Path::new("/game/textures/grass.png")),
            Some(ResourcePath::new("textures/grass.png"))
        );
        assert_eq!(relative_to(root, Path::new("/other/a.png")), None);
        assert_eq!(relative_to(root, Path::new("/game/.kiln/assets/1.res")), None);
        assert_eq!(relative_to(root, Path::new("/game")), None);
    }

    #[test]
    fn test_watcher_reports_writes() {
        let dir = tempfile::Builder::new().prefix("kiln-watch").tempdir().unwrap();
        let (watcher, batches) = FsWatcher::spawn(dir.path(), Duration::from_millis(50)).unwrap();

        std::fs::write(dir.path().join("grass.png"), b"png").unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        let mut seen = Vec::new();
        while std::time::Instant::now() < deadline {
            if let Ok(batch) = batches.recv_timeout(Duration::from_millis(200)) {
                seen.extend(batch.into_iter().map(|e| e.path));
                if seen.contains(&ResourcePath::new("grass.png")) {
                    break;
                }
            }
        }
        drop(watcher);
        assert!(seen.contains(&ResourcePath::new("grass.png")));
    }
}
