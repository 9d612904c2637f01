use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// Timing and per-path dedup of raw notify events.
pub(super) struct Debouncer {
    window: Duration,
    changes: FxHashMap<PathBuf, ChangeKind>,
    last_event: Option<Instant>,
}

impl Debouncer {
    pub(super) fn new(window: Duration) -> Self {
        Self {
            window,
            changes: FxHashMap::default(),
            last_event: None,
        }
    }

    /// Add a notify event, applying dedup rules:
    /// - Remove + Create/Modify → Create/Modify (file was restored)
    /// - Modify + Remove → Remove (file was deleted)
    /// - Create + Remove → nothing (appeared then vanished)
    /// - otherwise the first event wins
    pub(super) fn add_event(&mut self, event: &notify::Event) {
        use notify::EventKind;

        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            EventKind::Modify(modify) => {
                // metadata-only changes (atime, chmod) are noise
                if matches!(modify, notify::event::ModifyKind::Metadata(_)) {
                    return;
                }
                ChangeKind::Modified
            }
            _ => return,
        };

        crate::debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);

        for path in &event.paths {
            if is_temp_file(path) {
                continue;
            }
            self.record(path.clone(), kind);
        }
    }

    fn record(&mut self, path: PathBuf, kind: ChangeKind) {
        if let Some(&existing) = self.changes.get(&path) {
            match (existing, kind) {
                (ChangeKind::Removed, ChangeKind::Created | ChangeKind::Modified) => {
                    self.changes.insert(path, kind);
                }
                (ChangeKind::Modified, ChangeKind::Removed) => {
                    self.changes.insert(path, ChangeKind::Removed);
                }
                (ChangeKind::Created, ChangeKind::Removed) => {
                    crate::debug!("watch"; "discard created+removed: {}", path.display());
                    self.changes.remove(&path);
                }
                _ => return,
            }
        } else {
            self.changes.insert(path, kind);
        }
        self.last_event = Some(Instant::now());
    }

    /// Take the pending changes once the window has passed without events.
    pub(super) fn take_if_ready(&mut self) -> Option<Vec<(PathBuf, ChangeKind)>> {
        let last_event = self.last_event?;
        if last_event.elapsed() < self.window {
            return None;
        }
        self.last_event = None;

        let mut changes: Vec<_> = std::mem::take(&mut self.changes).into_iter().collect();
        if changes.is_empty() {
            return None;
        }
        changes.sort_by(|a, b| a.0.cmp(&b.0));
        Some(changes)
    }

    /// Precise sleep duration until next possible ready time.
    pub(super) fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };
        self.window
            .saturating_sub(last_event.elapsed())
            .max(Duration::from_millis(1))
    }
}

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, ModifyKind, RemoveKind};
    use notify::{Event, EventKind};

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    fn modified(path: &str) -> Event {
        event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), path)
    }

    #[test]
    fn test_waits_for_quiet_window() {
        let mut debouncer = Debouncer::new(Duration::from_secs(60));
        debouncer.add_event(&modified("/p/a.png"));
        assert!(debouncer.take_if_ready().is_none());
        assert!(debouncer.sleep_duration() <= Duration::from_secs(60));
    }

    #[test]
    fn test_dedup_and_transitions() {
        let mut debouncer = Debouncer::new(Duration::ZERO);
        debouncer.add_event(&modified("/p/a.png"));
        debouncer.add_event(&modified("/p/a.png"));
        debouncer.add_event(&event(EventKind::Remove(RemoveKind::File), "/p/a.png"));
        debouncer.add_event(&event(EventKind::Create(CreateKind::File), "/p/b.png"));
        debouncer.add_event(&event(EventKind::Remove(RemoveKind::File), "/p/b.png"));
        debouncer.add_event(&event(EventKind::Remove(RemoveKind::File), "/p/c.png"));
        debouncer.add_event(&event(EventKind::Create(CreateKind::File), "/p/c.png"));

        let changes = debouncer.take_if_ready().unwrap();
        assert_eq!(
            changes,
            vec![
                (PathBuf::from("/p/a.png"), ChangeKind::Removed),
                (PathBuf::from("/p/c.png"), ChangeKind::Created),
            ]
        );
        assert!(debouncer.take_if_ready().is_none());
    }

    #[test]
    fn test_ignores_noise() {
        let mut debouncer = Debouncer::new(Duration::ZERO);
        debouncer.add_event(&event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::AccessTime)),
            "/p/a.png",
        ));
        debouncer.add_event(&modified("/p/a.png.swp"));
        debouncer.add_event(&modified("/p/a.png~"));
        debouncer.add_event(&modified("/p/.hidden"));
        debouncer.add_event(&modified("/p/_list.json.tmp"));
        assert!(debouncer.take_if_ready().is_none());
    }
}
