//! Load interception: decide per load whether the artifact is usable.

use super::{AssetCompiler, LoadTicket};
use crate::core::ResourcePath;
use crate::freshness::is_stale;

/// What the loader should do with a load request.
#[derive(Debug)]
pub enum LoadAction {
    /// Load now: the artifact is current, or there is nothing to compile.
    Immediate,
    /// Park the load until the ticket resolves.
    Deferred(LoadTicket),
}

impl LoadAction {
    pub fn is_immediate(&self) -> bool {
        matches!(self, Self::Immediate)
    }

    pub fn into_ticket(self) -> Option<LoadTicket> {
        match self {
            Self::Immediate => None,
            Self::Deferred(ticket) => Some(ticket),
        }
    }
}

impl AssetCompiler {
    /// Called by the loading subsystem before every load. Safe to call from
    /// any thread.
    ///
    /// 1. missing source file or a path inside the artifact area → immediate
    /// 2. artifact missing, older than the source, or older than the meta
    ///    file → deferred, joining the job for the source file
    /// 3. otherwise → immediate
    pub fn on_before_load(&self, resource: &ResourcePath) -> LoadAction {
        let shared = &self.shared;
        let file = resource.file_path();

        if !shared.fs.exists(file.as_str()) || shared.layout.contains(&file) {
            return LoadAction::Immediate;
        }

        let artifact = shared.fs.modified(&shared.layout.locator(resource));
        let source = shared.fs.modified(file.as_str());
        let meta = shared.fs.modified(shared.meta_path(&file).as_str());

        if !is_stale(artifact, source, meta) {
            return LoadAction::Immediate;
        }

        crate::debug!("compile"; "{} is not compiled, queued", resource);
        LoadAction::Deferred(shared.queue.request(file, resource.clone()))
    }
}
