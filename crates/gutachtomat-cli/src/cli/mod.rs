//! CLI command definitions for the `gutachtomat` binary.

pub mod draft;
pub mod edit;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use gutachtomat_types::draft::DraftId;
use gutachtomat_types::storage::StorageMode;

/// Write psychotherapy report drafts with automatic saving.
#[derive(Parser)]
#[command(name = "gutachtomat", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Storage backend (overrides config.toml).
    #[arg(long, global = true, env = "GUTACHTOMAT_STORAGE")]
    pub storage: Option<StorageMode>,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an empty draft.
    New,

    /// List drafts, most recently edited first.
    #[command(alias = "ls")]
    List,

    /// Show a draft's answers and wizard position.
    Show {
        /// Draft id.
        id: DraftId,
    },

    /// Delete a draft.
    #[command(alias = "rm")]
    Delete {
        /// Draft id.
        id: DraftId,

        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },

    /// Edit a draft interactively with autosave.
    Edit {
        /// Draft id.
        id: DraftId,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        <Cli as clap::CommandFactory>::command().debug_assert();
    }

    #[test]
    fn parses_global_storage_flag() {
        let id = DraftId::new();
        let cli = Cli::try_parse_from([
            "gutachtomat",
            "edit",
            &id.to_string(),
            "--storage",
            "cloud",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.storage, Some(StorageMode::Cloud));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Edit { id: parsed } if parsed == id));
    }

    #[test]
    fn rejects_malformed_draft_id() {
        assert!(Cli::try_parse_from(["gutachtomat", "show", "not-a-uuid"]).is_err());
    }
}
