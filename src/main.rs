//! Kiln command-line entry point.

use anyhow::Result;
use clap::{ColorChoice, Parser};
use kiln::cli::{self, Cli, Commands};
use kiln::config::PipelineConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    kiln::core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    kiln::logger::set_verbose(cli.verbose);

    let config = PipelineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan => cli::scan::run_scan(&config),
        Commands::Build => cli::build::run_build(&config),
        Commands::Watch { debounce_ms } => cli::watch::run_watch(&config, debounce_ms),
        Commands::List { json } => cli::list::run_list(&config, json),
    }
}
