//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Incremental asset pipeline
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: search upward for kiln.toml)
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Reconcile the manifest with the project tree
    Scan,

    /// Compile every stale resource
    #[command(visible_alias = "b")]
    Build,

    /// Recompile on file changes until interrupted
    #[command(visible_alias = "w")]
    Watch {
        /// Debounce window in milliseconds (overrides [watch] debounce_ms)
        #[arg(short, long)]
        debounce_ms: Option<u64>,
    },

    /// Print known resources and registered types
    #[command(visible_alias = "ls")]
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["kiln", "watch", "-C", "game/kiln.toml", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("game/kiln.toml")));
        assert!(matches!(cli.command, Commands::Watch { debounce_ms: None }));
    }

    #[test]
    fn test_parse_list_json() {
        let cli = Cli::try_parse_from(["kiln", "ls", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::List { json: true }));
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
