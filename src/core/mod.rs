//! Core types shared across the pipeline.

mod kind;
mod path;
mod state;

pub use kind::{ResourceItem, ResourceType};
pub use path::{ResourcePath, SUBRESOURCE_SEPARATOR, extension_of};
pub use state::{is_shutdown, setup_shutdown_handler};
