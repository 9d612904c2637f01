//! Kiln - an incremental, on-demand asset pipeline.
//!
//! Source files are registered as resources, compiled by plugins into
//! artifacts under a hidden output directory, and recompiled only when the
//! source, its sidecar metadata, or one of its dependencies changed.
//!
//! | Module       | Purpose                                              |
//! |--------------|------------------------------------------------------|
//! | `registry`   | Known resources and the extension → type table       |
//! | `compiler`   | Dependency graph, compile queue, load hook, bridge   |
//! | `cache`      | Manifest persistence between runs                    |
//! | `freshness`  | Timestamp-based staleness                            |
//! | `watch`      | Debounced filesystem watcher                         |
//! | `config`     | `kiln.toml`                                          |

pub mod cache;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod core;
pub mod freshness;
pub mod fs;
pub mod loader;
pub mod logger;
pub mod registry;
pub mod utils;
pub mod watch;
