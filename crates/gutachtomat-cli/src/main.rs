//! Gutachtomat CLI entry point.
//!
//! Binary name: `gutachtomat`
//!
//! Parses CLI arguments, opens the configured draft store, then dispatches to
//! the command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use gutachtomat_observe::{LogFormat, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,gutachtomat_core=debug,gutachtomat_infra=debug,gutachtomat_cli=debug",
        _ => "trace",
    };
    let format = if cli.json { LogFormat::Json } else { LogFormat::Pretty };
    init_tracing(filter, format, cli.otel).map_err(|e| anyhow::anyhow!(e))?;

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "gutachtomat", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init(cli.storage).await?;

    let result = match cli.command {
        Commands::New => cli::draft::new_draft(&state, cli.json, cli.quiet).await,
        Commands::List => cli::draft::list_drafts(&state, cli.json).await,
        Commands::Show { id } => cli::draft::show_draft(&state, &id, cli.json).await,
        Commands::Delete { id, force } => {
            cli::draft::delete_draft(&state, &id, force, cli.json).await
        }
        Commands::Edit { id } => cli::edit::edit_draft(&state, id, cli.quiet).await,
        Commands::Completions { .. } => Ok(()),
    };

    shutdown_tracing();
    result
}
