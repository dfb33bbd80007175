//! Interactive draft editing session.
//!
//! Hosts a `DraftAutosave` coordinator for one draft. The user edits form
//! fields line by line; the coordinator persists changes on its own cadence,
//! on in-app navigation (`step`), and on demand (`save`). Every exit path
//! waits for outstanding writes; leaving with work that still could not be
//! saved asks for confirmation first.

use std::io::Write as _;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use console::style;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use gutachtomat_core::autosave::{
    AutosaveOptions, AutosaveParams, DraftAutosave, SaveListener, SaveOutcome, SkipReason,
    UnloadDecision,
};
use gutachtomat_core::storage::{BoxDraftStore, DraftStore};
use gutachtomat_types::draft::DraftId;
use gutachtomat_types::error::StorageError;
use gutachtomat_types::storage::StorageMode;

use super::draft::render_value;
use crate::state::AppState;

/// One line of session input.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Set {
        field: String,
        value: serde_json::Value,
    },
    Unset {
        field: String,
    },
    Step(u32),
    Save,
    Status,
    Show(Option<String>),
    Mode(StorageMode),
    Help,
    Quit,
}

impl SessionCommand {
    /// Parse one input line. Step numbers are 1-based for the user.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb {
            "set" => {
                let (field, raw) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| "usage: set <field> <value>".to_string())?;
                Ok(Self::Set {
                    field: field.to_string(),
                    value: parse_value(raw.trim()),
                })
            }
            "unset" if !rest.is_empty() => Ok(Self::Unset {
                field: rest.to_string(),
            }),
            "unset" => Err("usage: unset <field>".to_string()),
            "step" => {
                let step: u32 = rest
                    .parse()
                    .map_err(|_| "usage: step <number>".to_string())?;
                if step == 0 {
                    return Err("steps start at 1".to_string());
                }
                Ok(Self::Step(step - 1))
            }
            "save" => Ok(Self::Save),
            "status" => Ok(Self::Status),
            "show" => Ok(Self::Show((!rest.is_empty()).then(|| rest.to_string()))),
            "mode" => rest.parse().map(Self::Mode),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(format!("unknown command '{other}', type 'help'")),
        }
    }
}

/// JSON literals are taken as-is, anything else becomes a string.
fn parse_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

/// Prints save lifecycle events as short status lines.
struct ConsoleSaveListener {
    quiet: bool,
}

impl SaveListener for ConsoleSaveListener {
    fn on_save_complete(&self, _draft_id: &DraftId) {
        if !self.quiet {
            println!("  {} saved", style("✓").green());
        }
    }

    fn on_save_error(&self, _draft_id: &DraftId, error: &StorageError) {
        println!(
            "  {} save failed: {} (will retry)",
            style("✗").red().bold(),
            error
        );
    }
}

/// Run an interactive editing session for draft `id`.
pub async fn edit_draft(state: &AppState, id: DraftId, quiet: bool) -> Result<()> {
    let options = AutosaveOptions::from_config(&state.config.autosave, state.storage_mode);
    let params = AutosaveParams::new(Arc::clone(&state.store), id, options)
        .loading(true)
        .with_listener(Arc::new(ConsoleSaveListener { quiet }));
    let mut autosave = DraftAutosave::attach(params, &state.signals);

    let draft = state
        .store
        .load_draft(&id)
        .await?
        .ok_or_else(|| anyhow!("draft {id} not found, create one with `gutachtomat new`"))?;
    autosave.update_form_data(draft.form_data);
    autosave.update_wizard_state(draft.wizard_state);
    autosave.set_loading(false);

    if !quiet {
        println!();
        println!(
            "  {} Editing draft {} ({} storage, autosave every {}s)",
            style("✎").cyan().bold(),
            style(id).cyan(),
            state.storage_mode,
            autosave.save_interval().map(|d| d.as_secs()).unwrap_or_default()
        );
        println!("  Type {} for commands.", style("help").yellow());
        println!();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => Ok(Some("quit".to_string())),
        };
        // Input closed or unreadable: nobody is left to confirm, so flush and leave.
        let line = match line {
            Ok(Some(line)) => line,
            other => {
                if let Err(err) = other {
                    tracing::warn!(error = %err, "reading session input failed");
                }
                flush_before_leaving(&autosave).await;
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match SessionCommand::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("  {} {message}", style("!").yellow().bold());
                continue;
            }
        };

        match command {
            SessionCommand::Set { field, value } => {
                let mut form = autosave.form_data();
                form.set(field, value);
                autosave.update_form_data(form);
            }
            SessionCommand::Unset { field } => {
                let mut form = autosave.form_data();
                if form.remove(&field).is_none() {
                    println!("  {} no field '{field}'", style("!").yellow().bold());
                }
                autosave.update_form_data(form);
            }
            SessionCommand::Step(step) => {
                let mut wizard = autosave.wizard_state();
                wizard.go_to(step);
                autosave.update_wizard_state(wizard);
                state.signals.publish_save_before_navigate();
                if !quiet {
                    println!("  {} step {}", style("→").cyan(), step + 1);
                }
            }
            SessionCommand::Save => report_outcome(autosave.save().await),
            SessionCommand::Status => print_status(&autosave),
            SessionCommand::Show(field) => print_form(&autosave, field.as_deref()),
            SessionCommand::Mode(mode) => {
                if let Err(err) = switch_storage(state, &mut autosave, mode).await {
                    println!("  {} {err:#}", style("✗").red().bold());
                }
            }
            SessionCommand::Help => print_help(),
            SessionCommand::Quit => {
                flush_before_leaving(&autosave).await;
                if confirm_leave(state, &mut lines).await {
                    break;
                }
            }
        }
    }

    autosave.detach();
    Ok(())
}

/// Let any outstanding write finish and save what is left.
async fn flush_before_leaving<S: DraftStore + 'static>(autosave: &DraftAutosave<S>) {
    match autosave.flush().await {
        SaveOutcome::Skipped(SkipReason::Unchanged) => {}
        outcome => report_outcome(outcome),
    }
}

/// Ask before leaving when the unload guard still reports unsaved work.
///
/// The answer comes from the session's own line reader. Closed input counts
/// as consent.
async fn confirm_leave<R>(state: &AppState, lines: &mut Lines<R>) -> bool
where
    R: AsyncBufRead + Unpin,
{
    let UnloadDecision::Prompt { message } = state.signals.before_unload() else {
        return true;
    };
    print!("  {} {message} [y/N] ", style("?").yellow().bold());
    let _ = std::io::stdout().flush();
    match lines.next_line().await {
        Ok(Some(answer)) => is_yes(&answer),
        Ok(None) => true,
        Err(err) => {
            tracing::warn!(error = %err, "reading confirmation failed");
            true
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes" | "j" | "ja"
    )
}

async fn switch_storage(
    state: &AppState,
    autosave: &mut DraftAutosave<BoxDraftStore>,
    mode: StorageMode,
) -> Result<()> {
    if autosave.storage_mode() == mode {
        println!("  {} already using {mode} storage", style("i").blue().bold());
        return Ok(());
    }
    let store = state.open_store(mode).await?;
    autosave.set_adapter(Some(store));
    autosave.set_storage_mode(mode);
    // The new backend has never seen this draft, so write it there now.
    report_outcome(autosave.save().await);
    println!("  {} switched to {mode} storage", style("✓").green());
    Ok(())
}

fn report_outcome(outcome: SaveOutcome) {
    match outcome {
        // The listener already reported success or failure.
        SaveOutcome::Saved | SaveOutcome::Failed(_) => {}
        SaveOutcome::Skipped(SkipReason::Unchanged) => {
            println!("  {} nothing to save", style("i").blue().bold());
        }
        SaveOutcome::Skipped(SkipReason::InFlight) => {
            println!("  {} a save is already running", style("i").blue().bold());
        }
        SaveOutcome::Skipped(reason) => {
            println!("  {} save skipped: {reason:?}", style("!").yellow().bold());
        }
    }
}

fn print_status<S: DraftStore + 'static>(autosave: &DraftAutosave<S>) {
    let unsaved = autosave.has_unsaved_changes();
    let wizard = autosave.wizard_state();
    println!(
        "  {} {}",
        style("Changes:").bold(),
        if unsaved {
            style("unsaved").yellow().to_string()
        } else {
            style("saved").green().to_string()
        }
    );
    println!("  {} {}", style("Step:").bold(), wizard.current_step + 1);
    println!("  {} {}", style("Storage:").bold(), autosave.storage_mode());
    if let Some(interval) = autosave.save_interval() {
        println!("  {} every {}s", style("Autosave:").bold(), interval.as_secs());
    }
}

fn print_form<S: DraftStore + 'static>(autosave: &DraftAutosave<S>, field: Option<&str>) {
    let form = autosave.form_data();
    if let Some(field) = field {
        match form.get(field) {
            Some(value) => println!("  {} {}", style(format!("{field}:")).bold(), render_value(value)),
            None => println!("  {} no field '{field}'", style("!").yellow().bold()),
        }
        return;
    }
    match form.0.as_object() {
        Some(fields) if !fields.is_empty() => {
            for (field, value) in fields {
                println!("  {} {}", style(format!("{field}:")).bold(), render_value(value));
            }
        }
        _ => println!("  {}", style("(empty)").dim()),
    }
}

fn print_help() {
    let rows = [
        ("set <field> <value>", "set an answer (JSON literals allowed)"),
        ("unset <field>", "remove an answer"),
        ("step <n>", "go to wizard step n (saves first)"),
        ("save", "save now"),
        ("status", "show save state"),
        ("show [field]", "print current answers"),
        ("mode local|cloud", "switch storage backend"),
        ("quit", "leave the session"),
    ];
    for (usage, description) in rows {
        println!("  {:<22} {}", style(usage).yellow(), style(description).dim());
    }
}
