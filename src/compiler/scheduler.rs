//! Compile queue with a single background worker.
//!
//! - `request()` is the only way in: it joins an existing job for the same
//!   file or creates one and wakes the worker
//! - the worker compiles one job at a time, FIFO, and reports a
//!   [`Completion`] on the completed channel
//! - the owner drains completions on its own thread and calls `complete()`,
//!   which resumes every waiter of that job exactly once

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use smallvec::{SmallVec, smallvec};

use crate::core::ResourcePath;

// =============================================================================
// Public types
// =============================================================================

/// Result of one compile job, delivered to every waiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    Compiled,
    Failed(String),
}

/// A finished job, waiting for the drain.
#[derive(Debug, Clone)]
pub struct Completion {
    pub path: ResourcePath,
    pub outcome: CompileOutcome,
}

/// Handle for a deferred load, fulfilled once the job for its file has been
/// drained.
#[derive(Debug)]
pub struct LoadTicket {
    resource: ResourcePath,
    rx: Receiver<CompileOutcome>,
}

impl LoadTicket {
    /// Resource whose load was deferred.
    pub fn resource(&self) -> &ResourcePath {
        &self.resource
    }

    /// Non-blocking poll.
    pub fn try_outcome(&self) -> Option<CompileOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(shut_down()),
        }
    }

    /// Block until the job is drained.
    ///
    /// Only call this from a thread other than the one that drains, or the
    /// wait never ends.
    pub fn wait(self) -> CompileOutcome {
        self.rx.recv().unwrap_or_else(|_| shut_down())
    }

    /// Block for at most `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<CompileOutcome> {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(shut_down()),
        }
    }
}

fn shut_down() -> CompileOutcome {
    CompileOutcome::Failed("compiler shut down".into())
}

/// Progress of the current batch (jobs queued since the queue was last idle).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchProgress {
    pub total: usize,
    pub remaining: usize,
    /// File the worker is compiling right now.
    pub in_progress: Option<ResourcePath>,
}

impl BatchProgress {
    pub fn done(&self) -> usize {
        self.total - self.remaining
    }

    pub fn is_idle(&self) -> bool {
        self.remaining == 0
    }
}

// =============================================================================
// Queue
// =============================================================================

pub(crate) enum WorkerMsg {
    Compile(ResourcePath),
    Stop,
}

type Waiter = Sender<CompileOutcome>;

#[derive(Debug, Default, Clone, Copy)]
struct BatchCounters {
    total: usize,
    remaining: usize,
}

/// Pending jobs (file → waiters) plus the job channel feeding the worker.
pub(crate) struct CompileQueue {
    pending: DashMap<ResourcePath, SmallVec<[Waiter; 2]>>,
    jobs_tx: Sender<WorkerMsg>,
    batch: Mutex<BatchCounters>,
    in_progress: Mutex<Option<ResourcePath>>,
    stopping: AtomicBool,
}

impl CompileQueue {
    pub(crate) fn new() -> (Self, Receiver<WorkerMsg>) {
        let (jobs_tx, jobs_rx) = channel::unbounded();
        let queue = Self {
            pending: DashMap::new(),
            jobs_tx,
            batch: Mutex::new(BatchCounters::default()),
            in_progress: Mutex::new(None),
            stopping: AtomicBool::new(false),
        };
        (queue, jobs_rx)
    }

    /// Park a load of `resource` on the job for `file`, creating the job if
    /// none is pending.
    ///
    /// The stop flag is re-read under the entry lock: `abandon()` clears the
    /// map after `stop()`, so nothing can be parked behind its back. A ticket
    /// that cannot be queued is returned with its sender dropped and
    /// resolves as shut down.
    pub(crate) fn request(&self, file: ResourcePath, resource: ResourcePath) -> LoadTicket {
        let (tx, rx) = channel::bounded(1);
        let ticket = LoadTicket { resource, rx };

        if self.is_stopping() {
            return ticket;
        }

        match self.pending.entry(file) {
            Entry::Occupied(mut e) => {
                if !self.is_stopping() {
                    e.get_mut().push(tx);
                }
            }
            Entry::Vacant(e) => {
                if self.is_stopping() {
                    return ticket;
                }
                // the shard stays locked until the insert, so a fast worker's
                // completion cannot be drained before the job is counted
                if self.jobs_tx.send(WorkerMsg::Compile(e.key().clone())).is_err() {
                    crate::log!("compile"; "worker is gone, {} will not compile", e.key());
                    return ticket;
                }
                {
                    let mut batch = self.batch.lock();
                    batch.total += 1;
                    batch.remaining += 1;
                }
                e.insert(smallvec![tx]);
            }
        }
        ticket
    }

    /// Resume every waiter of `path` with `outcome` and close the job.
    ///
    /// Returns the number of waiters resumed.
    pub(crate) fn complete(&self, path: &ResourcePath, outcome: &CompileOutcome) -> usize {
        let Some((_, waiters)) = self.pending.remove(path) else {
            return 0;
        };

        for tx in &waiters {
            // a dropped ticket just means nobody is listening anymore
            let _ = tx.send(outcome.clone());
        }

        let mut batch = self.batch.lock();
        batch.remaining = batch.remaining.saturating_sub(1);
        if batch.remaining == 0 {
            batch.total = 0;
        }
        waiters.len()
    }

    /// Number of waiters parked on `path` (`None` if no job is pending).
    pub(crate) fn waiters(&self, path: &ResourcePath) -> Option<usize> {
        self.pending.get(path).map(|w| w.len())
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn progress(&self) -> BatchProgress {
        let batch = *self.batch.lock();
        BatchProgress {
            total: batch.total,
            remaining: batch.remaining,
            in_progress: self.in_progress.lock().clone(),
        }
    }

    pub(crate) fn set_in_progress(&self, path: Option<ResourcePath>) {
        *self.in_progress.lock() = path;
    }

    pub(crate) fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    /// Stop accepting jobs and wake the worker so it can exit.
    pub(crate) fn stop(&self) {
        if !self.stopping.swap(true, Ordering::SeqCst) {
            let _ = self.jobs_tx.send(WorkerMsg::Stop);
        }
    }

    /// Drop every parked waiter; their tickets resolve as shut down.
    pub(crate) fn abandon(&self) -> usize {
        let abandoned = self.pending.len();
        self.pending.clear();
        *self.batch.lock() = BatchCounters::default();
        abandoned
    }
}

// =============================================================================
// Worker
// =============================================================================

/// Spawn the worker thread.
///
/// `compile` runs outside every lock; a panic inside it is caught and
/// reported as a failed compile so waiters are always resumed.
pub(crate) fn spawn_worker<F>(
    jobs: Receiver<WorkerMsg>,
    completed: Sender<Completion>,
    is_stopping: impl Fn() -> bool + Send + 'static,
    compile: F,
) -> std::io::Result<JoinHandle<()>>
where
    F: Fn(&ResourcePath) -> CompileOutcome + Send + 'static,
{
    std::thread::Builder::new()
        .name("kiln-compiler".into())
        .spawn(move || {
            while let Ok(msg) = jobs.recv() {
                let WorkerMsg::Compile(path) = msg else {
                    break;
                };
                if is_stopping() {
                    break;
                }

                crate::debug!("compile"; "compiling {}", path);
                let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| compile(&path)))
                    .unwrap_or_else(|_| CompileOutcome::Failed("compilation panicked".into()));

                if completed.send(Completion { path, outcome }).is_err() {
                    break;
                }
            }
            crate::debug!("compile"; "worker stopped");
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> ResourcePath {
        ResourcePath::new(s)
    }

    #[test]
    fn test_request_dedups_by_file() {
        let (queue, jobs) = CompileQueue::new();
        let file = path("models/hero.fbx");

        let _a = queue.request(file.clone(), path("walk.ani:models/hero.fbx"));
        let _b = queue.request(file.clone(), path("run.ani:models/hero.fbx"));

        assert_eq!(queue.pending_len(), 1);
        assert_eq!(queue.waiters(&file), Some(2));
        assert_eq!(jobs.try_iter().count(), 1);

        let progress = queue.progress();
        assert_eq!((progress.total, progress.remaining), (1, 1));
    }

    #[test]
    fn test_complete_resumes_all_waiters_once() {
        let (queue, _jobs) = CompileQueue::new();
        let file = path("a.png");
        let a = queue.request(file.clone(), file.clone());
        let b = queue.request(file.clone(), file.clone());

        assert!(a.try_outcome().is_none());
        assert_eq!(queue.complete(&file, &CompileOutcome::Compiled), 2);
        assert_eq!(a.try_outcome(), Some(CompileOutcome::Compiled));
        assert_eq!(b.wait(), CompileOutcome::Compiled);

        // batch resets once idle
        assert_eq!(queue.progress(), BatchProgress::default());
        assert_eq!(queue.waiters(&file), None);
    }

    #[test]
    fn test_batch_counts_across_jobs() {
        let (queue, _jobs) = CompileQueue::new();
        let _a = queue.request(path("a.png"), path("a.png"));
        let _b = queue.request(path("b.png"), path("b.png"));

        queue.complete(&path("a.png"), &CompileOutcome::Failed("bad".into()));
        let progress = queue.progress();
        assert_eq!((progress.total, progress.remaining, progress.done()), (2, 1, 1));

        queue.complete(&path("b.png"), &CompileOutcome::Compiled);
        assert!(queue.progress().is_idle());
        assert_eq!(queue.progress().total, 0);
    }

    #[test]
    fn test_stopped_queue_resolves_tickets() {
        let (queue, _jobs) = CompileQueue::new();
        let parked = queue.request(path("a.png"), path("a.png"));
        queue.stop();

        let late = queue.request(path("b.png"), path("b.png"));
        assert_eq!(late.try_outcome(), Some(shut_down()));

        assert_eq!(queue.abandon(), 1);
        assert_eq!(parked.wait_timeout(Duration::from_secs(1)), Some(shut_down()));
    }

    #[test]
    fn test_request_after_worker_exit_resolves_at_once() {
        let (queue, jobs) = CompileQueue::new();
        drop(jobs);

        let ticket = queue.request(path("a.png"), path("a.png"));

        assert_eq!(ticket.wait_timeout(Duration::from_secs(1)), Some(shut_down()));
        assert_eq!(queue.pending_len(), 0);
        assert_eq!(queue.progress(), BatchProgress::default());
    }

    #[test]
    fn test_abandon_then_late_request_does_not_park() {
        let (queue, jobs) = CompileQueue::new();
        queue.stop();
        drop(jobs);
        assert_eq!(queue.abandon(), 0);

        let late = queue.request(path("a.png"), path("a.png"));
        assert_eq!(late.try_outcome(), Some(shut_down()));
        assert_eq!(queue.pending_len(), 0);
        assert!(queue.progress().is_idle());
    }

    #[test]
    fn test_worker_reports_panics() {
        let (queue, jobs) = CompileQueue::new();
        let (done_tx, done_rx) = channel::unbounded();
        let handle = spawn_worker(jobs, done_tx, || false, |p: &ResourcePath| {
            if p.as_str() == "boom.png" {
                panic!("plugin bug");
            }
            CompileOutcome::Compiled
        })
        .unwrap();

        let _a = queue.request(path("boom.png"), path("boom.png"));
        let _b = queue.request(path("ok.png"), path("ok.png"));

        let first = done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let second = done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first.path, path("boom.png"));
        assert!(matches!(first.outcome, CompileOutcome::Failed(_)));
        assert_eq!(second.outcome, CompileOutcome::Compiled);

        queue.stop();
        handle.join().unwrap();
    }
}
