//! Asset compiler: registry, dependency graph, compile queue and the
//! load-interception protocol.
//!
//! # Threads
//!
//! ```text
//! loader threads ──on_before_load──▶ CompileQueue ──jobs──▶ worker
//!                                         ▲                   │
//! owner thread ────────update()───────────┴────completed──────┘
//! watcher thread ──on_file_changed──▶ Registry / DependencyGraph ──▶ ResourceLoader::reload
//! ```
//!
//! The owner calls [`AssetCompiler::update`] once per tick; that is the only
//! place deferred loads are resumed.

mod artifact;
mod bridge;
mod context;
pub mod dependency;
mod discovery;
mod error;
mod hook;
mod plugin;
mod scheduler;


use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{self, Receiver};
use parking_lot::{Mutex, RwLock};

use crate::cache::{Manifest, ManifestStore};
use crate::core::{ResourceItem, ResourcePath, ResourceType};
use crate::fs::FileSystem;
use crate::loader::ResourceLoader;
use crate::registry::{Registry, RegistryError, RegistryGuard};

pub use artifact::ArtifactLayout;
pub use bridge::FileChange;
pub use context::CompileContext;
pub use dependency::DependencyGraph;
pub use discovery::ScanSummary;
pub use error::CompilerError;
pub use hook::LoadAction;
pub use plugin::{AssetPlugin, CopyPlugin, Plugins};
pub use scheduler::{BatchProgress, CompileOutcome, Completion, LoadTicket};

use scheduler::CompileQueue;

// =============================================================================
// Options
// =============================================================================

/// Layout settings, usually built from the config file.
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Artifact directory, relative to the filesystem base.
    pub output_dir: String,
    pub artifact_extension: String,
    /// Manifest file name inside `output_dir`.
    pub manifest: String,
    /// Extension of sidecar metadata files.
    pub meta_extension: String,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            output_dir: ".kiln/assets".into(),
            artifact_extension: "res".into(),
            manifest: "_list.json".into(),
            meta_extension: "meta".into(),
        }
    }
}

// =============================================================================
// Shared state
// =============================================================================

/// State reachable from the owner, the worker and plugin contexts.
pub(crate) struct Shared {
    pub(crate) fs: Arc<dyn FileSystem>,
    pub(crate) loader: Arc<dyn ResourceLoader>,
    pub(crate) plugins: Arc<Plugins>,
    pub(crate) registry: Registry,
    pub(crate) deps: RwLock<DependencyGraph>,
    pub(crate) queue: CompileQueue,
    pub(crate) layout: ArtifactLayout,
    pub(crate) manifest: ManifestStore,
    meta_extension: String,
}

impl Shared {
    /// Compile one file with the plugin registered for its extension and
    /// write the returned bytes as its artifact.
    fn compile(&self, file: &ResourcePath) -> Result<(), CompilerError> {
        let plugin = self
            .plugins
            .for_path(file)
            .ok_or_else(|| CompilerError::MissingPlugin(file.clone()))?;

        let ctx = CompileContext::new(self, file);
        let bytes = plugin.compile(&ctx).map_err(|e| CompilerError::Plugin {
            path: file.clone(),
            reason: format!("{e:#}"),
        })?;

        self.write_compiled_resource(file, &bytes)
    }

    /// Worker entry: compile and turn the result into an outcome.
    fn run_job(&self, file: &ResourcePath) -> CompileOutcome {
        let _in_progress = InProgress::set(&self.queue, file);

        match self.compile(file) {
            Ok(()) => {
                crate::debug!("compile"; "compiled {}", file);
                CompileOutcome::Compiled
            }
            Err(e) => {
                let reason = format!("{:#}", anyhow::Error::new(e));
                crate::log!("compile"; "{}", reason);
                CompileOutcome::Failed(reason)
            }
        }
    }

    pub(crate) fn write_compiled_resource(
        &self,
        locator: &ResourcePath,
        data: &[u8],
    ) -> Result<(), CompilerError> {
        let out = self.layout.locator(locator);
        self.fs.write(&out, data).map_err(CompilerError::io(out))
    }

    pub(crate) fn copy_compile(&self, src: &ResourcePath) -> Result<(), CompilerError> {
        let out = self.layout.locator(src);
        self.fs
            .copy(src.file(), &out)
            .map_err(CompilerError::io(src.file()))
    }

    pub(crate) fn register_dependency(&self, consumer: ResourcePath, dependency: ResourcePath) -> bool {
        self.deps.write().register(consumer, dependency)
    }

    /// `<dir>/<basename>.<meta_extension>` of the underlying file.
    pub(crate) fn meta_path(&self, path: &ResourcePath) -> ResourcePath {
        path.with_extension(&self.meta_extension)
    }

    pub(crate) fn meta(&self, path: &ResourcePath) -> Result<Option<toml::Table>, CompilerError> {
        let meta_path = self.meta_path(path);
        if !self.fs.exists(meta_path.as_str()) {
            return Ok(None);
        }
        let bytes = self
            .fs
            .read(meta_path.as_str())
            .map_err(CompilerError::io(meta_path.as_str()))?;
        let content = String::from_utf8_lossy(&bytes);
        content
            .parse::<toml::Table>()
            .map(Some)
            .map_err(|source| CompilerError::MetaParse {
                path: meta_path.to_string(),
                source,
            })
    }

    fn update_meta(&self, path: &ResourcePath, meta: &toml::Table) -> Result<(), CompilerError> {
        let meta_path = self.meta_path(path);
        let content = toml::to_string(meta).map_err(|source| CompilerError::MetaFormat {
            path: meta_path.to_string(),
            source,
        })?;
        self.fs
            .write(meta_path.as_str(), content.as_bytes())
            .map_err(CompilerError::io(meta_path.as_str()))
    }
}

/// Marks a file as being compiled for the lifetime of the guard.
struct InProgress<'a>(&'a CompileQueue);

impl<'a> InProgress<'a> {
    fn set(queue: &'a CompileQueue, file: &ResourcePath) -> Self {
        queue.set_in_progress(Some(file.clone()));
        Self(queue)
    }
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.0.set_in_progress(None);
    }
}

// =============================================================================
// AssetCompiler
// =============================================================================

/// The compiler engine. Collaborators are injected at construction.
pub struct AssetCompiler {
    shared: Arc<Shared>,
    completed: Receiver<Completion>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AssetCompiler {
    /// Create the output directory and start the worker.
    pub fn new(
        options: CompilerOptions,
        fs: Arc<dyn FileSystem>,
        loader: Arc<dyn ResourceLoader>,
        plugins: Arc<Plugins>,
    ) -> Result<Self, CompilerError> {
        let layout = ArtifactLayout::new(&options.output_dir, &options.artifact_extension);
        fs.create_dir_all(layout.output_dir())
            .map_err(CompilerError::io(layout.output_dir()))?;

        let manifest = ManifestStore::new(format!("{}/{}", layout.output_dir(), options.manifest));
        let (queue, jobs) = CompileQueue::new();
        let (completed_tx, completed) = channel::unbounded();

        let shared = Arc::new(Shared {
            fs,
            loader,
            plugins,
            registry: Registry::new(),
            deps: RwLock::new(DependencyGraph::new()),
            queue,
            layout,
            manifest,
            meta_extension: options.meta_extension,
        });

        let stop_flag = Arc::clone(&shared);
        let job_shared = Arc::clone(&shared);
        let handle = scheduler::spawn_worker(
            jobs,
            completed_tx,
            move || stop_flag.queue.is_stopping(),
            move |file| job_shared.run_job(file),
        )
        .map_err(CompilerError::Spawn)?;

        Ok(Self {
            shared,
            completed,
            worker: Mutex::new(Some(handle)),
        })
    }

    // -------------------------------------------------------------------------
    // Registry
    // -------------------------------------------------------------------------

    pub fn register_extension(&self, ext: &str, kind: impl Into<ResourceType>) -> Result<(), RegistryError> {
        self.shared.registry.register_extension(ext, kind.into())
    }

    pub fn accepts_extension(&self, ext: &str, kind: &ResourceType) -> bool {
        self.shared.registry.accepts_extension(ext, kind)
    }

    pub fn resource_type(&self, path: &ResourcePath) -> Option<ResourceType> {
        self.shared.registry.resource_type(path)
    }

    /// Register a resource; idempotent by path.
    pub fn add_resource(&self, path: impl Into<ResourcePath>, kind: impl Into<ResourceType>) -> bool {
        self.shared.registry.add(path.into(), kind.into())
    }

    /// Remove every resource rooted at `file` and scrub `file` from every
    /// dependency list. Returns the removed resource paths.
    pub fn remove_resource(&self, file: &ResourcePath) -> Vec<ResourcePath> {
        let file = file.file_path();
        let removed = self.shared.registry.remove_under(&file);
        self.shared.deps.write().remove_dependent(&file);
        removed
    }

    /// Hold the registry lock for iteration. Every registry operation,
    /// including the watcher's, blocks until the guard is released.
    pub fn lock_resources(&self) -> RegistryGuard<'_> {
        self.shared.registry.lock()
    }

    /// Sorted copy of every known resource.
    pub fn resources(&self) -> Vec<ResourceItem> {
        self.shared.registry.snapshot()
    }

    // -------------------------------------------------------------------------
    // Plugins and dependencies
    // -------------------------------------------------------------------------

    pub fn add_plugin(&self, plugin: Arc<dyn AssetPlugin>, extensions: &[&str]) {
        self.shared.plugins.add(plugin, extensions);
    }

    pub fn remove_plugin(&self, plugin: &Arc<dyn AssetPlugin>) -> usize {
        self.shared.plugins.remove(plugin)
    }

    /// Record that `consumer` was compiled from `dependency`.
    pub fn register_dependency(
        &self,
        consumer: impl Into<ResourcePath>,
        dependency: impl Into<ResourcePath>,
    ) -> bool {
        self.shared
            .register_dependency(consumer.into(), dependency.into())
    }

    pub fn dependents(&self, dependency: &ResourcePath) -> Vec<ResourcePath> {
        self.shared.deps.read().dependents(dependency).to_vec()
    }

    // -------------------------------------------------------------------------
    // Artifacts and metadata
    // -------------------------------------------------------------------------

    /// Artifact path of `resource`, relative to the filesystem base.
    pub fn locator(&self, resource: &ResourcePath) -> String {
        self.shared.layout.locator(resource)
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.shared.layout
    }

    pub fn write_compiled_resource(&self, locator: &ResourcePath, data: &[u8]) -> Result<(), CompilerError> {
        self.shared.write_compiled_resource(locator, data)
    }

    pub fn copy_compile(&self, src: &ResourcePath) -> Result<(), CompilerError> {
        self.shared.copy_compile(src)
    }

    /// Sidecar metadata of `path`'s file, `None` if there is none.
    pub fn meta(&self, path: &ResourcePath) -> Result<Option<toml::Table>, CompilerError> {
        self.shared.meta(path)
    }

    pub fn update_meta(&self, path: &ResourcePath, meta: &toml::Table) -> Result<(), CompilerError> {
        self.shared.update_meta(path, meta)
    }

    /// Compile `file` on the calling thread, bypassing the queue.
    pub fn compile(&self, file: &ResourcePath) -> Result<(), CompilerError> {
        self.shared.compile(&file.file_path())
    }

    // -------------------------------------------------------------------------
    // Queue
    // -------------------------------------------------------------------------

    pub fn progress(&self) -> BatchProgress {
        self.shared.queue.progress()
    }

    /// Resume the waiters of every finished job. Call once per tick on the
    /// owner thread.
    pub fn update(&self) -> Vec<Completion> {
        let completions: Vec<_> = self.completed.try_iter().collect();
        for completion in &completions {
            let resumed = self
                .shared
                .queue
                .complete(&completion.path, &completion.outcome);
            crate::debug!("compile"; "{} done, resumed {} load(s)", completion.path, resumed);
        }
        completions
    }

    /// Snapshot the registry and dependency graph to the manifest.
    pub fn save_manifest(&self) -> Result<(), CompilerError> {
        let manifest = {
            let table = self.shared.registry.lock();
            let deps = self.shared.deps.read();
            Manifest::capture(&table, &deps)
        };
        self.shared.manifest.save(&*self.shared.fs, &manifest)?;
        Ok(())
    }

    /// Stop the worker, resolve what it finished, and save the manifest.
    ///
    /// Jobs that never ran resolve as failed. Calling this again only saves
    /// the manifest.
    pub fn shutdown(&self) -> Result<(), CompilerError> {
        let worker = self.worker.lock().take();
        if let Some(handle) = worker {
            self.shared.queue.stop();
            if handle.join().is_err() {
                crate::log!("compile"; "worker thread panicked");
            }
            self.update();
            let abandoned = self.shared.queue.abandon();
            if abandoned > 0 {
                crate::debug!("compile"; "{} job(s) abandoned at shutdown", abandoned);
            }
        }
        self.save_manifest()
    }
}

impl Drop for AssetCompiler {
    fn drop(&mut self) {
        if self.worker.lock().is_none() {
            return;
        }
        if let Err(e) = self.shutdown() {
            crate::log!("manifest"; "{:#}", anyhow::Error::new(e));
        }
    }
}
