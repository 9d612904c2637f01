//! `kiln list`: snapshot of the registry after a scan.

use std::sync::Arc;

use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::compiler::AssetCompiler;
use crate::config::PipelineConfig;
use crate::loader::NullLoader;
use crate::registry::RegistryTable;

#[derive(Debug, Serialize)]
struct Listing<'a> {
    types: Vec<TypeEntry<'a>>,
    resources: Vec<ResourceEntry>,
}

#[derive(Debug, Serialize)]
struct TypeEntry<'a> {
    extension: &'a str,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Serialize)]
struct ResourceEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    artifact: String,
}

pub fn run_list(config: &PipelineConfig, json: bool) -> Result<()> {
    let compiler = super::open_compiler(config, Arc::new(NullLoader))?;
    compiler.initialize();

    let output = {
        let table = compiler.lock_resources();
        let listing = Listing {
            types: table
                .extensions()
                .into_iter()
                .map(|(extension, kind)| TypeEntry {
                    extension,
                    kind: kind.to_string(),
                })
                .collect(),
            resources: resource_entries(&compiler, &table),
        };
        if json {
            serde_json::to_string_pretty(&listing)?
        } else {
            render(&listing)
        }
    };
    println!("{output}");

    compiler.shutdown()?;
    Ok(())
}

/// Read from the held guard: taking the registry lock again would deadlock.
fn resource_entries(compiler: &AssetCompiler, table: &RegistryTable) -> Vec<ResourceEntry> {
    let mut items: Vec<_> = table.iter().collect();
    items.sort_by(|a, b| a.path.cmp(&b.path));
    items
        .into_iter()
        .map(|item| ResourceEntry {
            artifact: compiler.locator(&item.path),
            path: item.path.to_string(),
            kind: item.kind.to_string(),
        })
        .collect()
}

fn render(listing: &Listing<'_>) -> String {
    let mut out = String::new();
    for entry in &listing.types {
        out.push_str(&format!("{} {}\n", format!(".{}", entry.extension).cyan(), entry.kind));
    }
    if !listing.types.is_empty() {
        out.push('\n');
    }
    for entry in &listing.resources {
        out.push_str(&format!(
            "{:<10} {} {}\n",
            entry.kind,
            entry.path,
            format!("→ {}", entry.artifact).dimmed()
        ));
    }
    out.push_str(&format!("{} resource(s)", listing.resources.len()));
    out
}
