//! Draft lifecycle CLI commands: new, list, show, delete.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;

use gutachtomat_core::storage::DraftStore;
use gutachtomat_types::draft::{DraftId, FormData, WizardState};

use crate::state::AppState;

/// Create an empty draft and print its id.
pub async fn new_draft(state: &AppState, json: bool, quiet: bool) -> Result<()> {
    let id = DraftId::new();
    state
        .store
        .save_draft(&id, &FormData::empty(), &WizardState::default())
        .await?;
    tracing::info!(draft_id = %id, backend = state.store.backend(), "draft created");

    if json {
        println!("{}", serde_json::json!({ "id": id, "storage": state.storage_mode }));
    } else if quiet {
        println!("{id}");
    } else {
        println!();
        println!(
            "  {} Draft created ({} storage)",
            style("✓").green().bold(),
            style(state.storage_mode).cyan()
        );
        println!("  {} {}", style("ID:").bold(), style(id).dim());
        println!();
        println!(
            "  Start writing with: {}",
            style(format!("gutachtomat edit {id}")).yellow()
        );
        println!();
    }
    Ok(())
}

/// List all drafts in the active backend.
pub async fn list_drafts(state: &AppState, json: bool) -> Result<()> {
    let drafts = state.store.list_drafts().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&drafts)?);
        return Ok(());
    }

    if drafts.is_empty() {
        println!();
        println!(
            "  {} No drafts found. Create one with: {}",
            style("i").blue().bold(),
            style("gutachtomat new").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Step").fg(Color::White),
        Cell::new("Fields").fg(Color::White),
        Cell::new("Last Edited").fg(Color::White),
    ]);

    for draft in &drafts {
        table.add_row(vec![
            Cell::new(draft.id).fg(Color::Cyan),
            Cell::new(draft.current_step + 1),
            Cell::new(draft.field_count),
            Cell::new(format_relative_time(&draft.updated_at)).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} draft{} ({} storage)",
        style(drafts.len()).bold(),
        if drafts.len() == 1 { "" } else { "s" },
        state.storage_mode
    );
    println!();
    Ok(())
}

/// Show one draft in full.
pub async fn show_draft(state: &AppState, id: &DraftId, json: bool) -> Result<()> {
    let draft = state
        .store
        .load_draft(id)
        .await?
        .ok_or_else(|| anyhow!("draft {id} not found"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&draft)?);
        return Ok(());
    }

    println!();
    println!("  {} {}", style("Draft").bold(), style(draft.id).cyan());
    println!();
    println!("  {}", style("── Answers ──").dim());
    match draft.form_data.0.as_object() {
        Some(fields) if !fields.is_empty() => {
            for (field, value) in fields {
                println!("  {:<24} {}", style(field).bold(), render_value(value));
            }
        }
        _ => println!("  {}", style("(empty)").dim()),
    }
    println!();
    println!("  {}", style("── Wizard ──").dim());
    println!(
        "  {:<24} {}",
        style("Current step:").bold(),
        draft.wizard_state.current_step + 1
    );
    let completed: Vec<String> = draft
        .wizard_state
        .completed_steps
        .iter()
        .map(|step| (step + 1).to_string())
        .collect();
    println!(
        "  {:<24} {}",
        style("Completed steps:").bold(),
        if completed.is_empty() {
            "none".to_string()
        } else {
            completed.join(", ")
        }
    );
    println!();
    println!("  {}", style("── Timestamps ──").dim());
    println!(
        "  {:<24} {}",
        style("Created:").bold(),
        draft.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "  {:<24} {}",
        style("Updated:").bold(),
        draft.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();
    Ok(())
}

/// Delete a draft after confirmation.
pub async fn delete_draft(state: &AppState, id: &DraftId, force: bool, json: bool) -> Result<()> {
    if state.store.load_draft(id).await?.is_none() {
        return Err(anyhow!("draft {id} not found"));
    }

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Permanently delete draft {}?",
                style(id).red().bold()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    state.store.delete_draft(id).await?;
    tracing::info!(draft_id = %id, "draft deleted");

    if json {
        println!("{}", serde_json::json!({ "deleted": true, "id": id }));
    } else {
        println!("  {} Draft {} deleted.", style("✓").red().bold(), id);
    }
    Ok(())
}

/// Strings print bare, everything else as compact JSON.
pub(crate) fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_relative_time(dt: &DateTime<Utc>) -> String {
    let elapsed = Utc::now().signed_duration_since(*dt);
    if elapsed.num_seconds() < 60 {
        "just now".to_string()
    } else if elapsed.num_minutes() < 60 {
        format!("{}m ago", elapsed.num_minutes())
    } else if elapsed.num_hours() < 24 {
        format!("{}h ago", elapsed.num_hours())
    } else {
        format!("{}d ago", elapsed.num_days())
    }
}
