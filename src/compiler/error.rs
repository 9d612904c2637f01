use std::io;

use thiserror::Error;

use crate::cache::ManifestError;
use crate::core::ResourcePath;

#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("I/O error on `{path}`")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("invalid meta file `{path}`")]
    MetaParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot write meta file `{path}`")]
    MetaFormat {
        path: String,
        #[source]
        source: toml::ser::Error,
    },

    #[error("no plugin registered for `{0}`")]
    MissingPlugin(ResourcePath),

    #[error("failed to compile `{path}`: {reason}")]
    Plugin { path: ResourcePath, reason: String },

    #[error("failed to start the compile worker")]
    Spawn(#[source] io::Error),
}

impl CompilerError {
    pub(crate) fn io(path: impl Into<String>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
