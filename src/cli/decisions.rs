//! CLI `decisions` commands: list, show, delete, status.

use anyhow::{bail, Context, Result};

use neurolinker::storage::types::{ChatFilter, DecisionInput, RecordId};
use neurolinker::storage::StorageBackend;

use super::{confirm, truncate};

/// List decisions, newest first.
pub fn list(storage: &dyn StorageBackend, owner: &RecordId, limit: Option<usize>) -> Result<()> {
    let decisions = storage
        .get_user_decisions(owner, limit)
        .context("failed to load decisions")?;

    if decisions.is_empty() {
        println!("No decisions yet. Run `neurolinker record` to add one.");
        return Ok(());
    }

    println!("{:<36}  {:<10}  {:<10}  Title", "Id", "Created", "Status");
    for d in &decisions {
        println!(
            "{:<36}  {:<10}  {:<10}  {}",
            d.id,
            d.created_at.format("%Y-%m-%d"),
            d.outcome_status,
            truncate(d.title.as_deref().unwrap_or("Untitled"), 60),
        );
    }
    println!("\n{} decision(s).", decisions.len());
    Ok(())
}

/// Show one decision with its linked conversation.
pub fn show(storage: &dyn StorageBackend, owner: &RecordId, id: &str) -> Result<()> {
    let Some(d) = storage.get_decision(owner, id).context("failed to load decision")? else {
        bail!("no decision {id}");
    };

    println!("{}", d.title.as_deref().unwrap_or("Untitled"));
    println!("{}", "=".repeat(40));
    println!("Id:               {}", d.id);
    println!("Created:          {}", d.created_at.format("%Y-%m-%d %H:%M"));
    println!("Status:           {}", d.outcome_status);
    println!("Memory layer:     {}", d.memory_layer);
    println!();
    print_field("Description", d.description.as_deref());
    print_field("Goal", d.goal.as_deref());
    print_list("Constraints", &d.constraints);
    print_list("Alternatives", &d.alternatives);
    print_field("Final choice", d.final_choice.as_deref());
    print_field("Reasoning", d.reasoning.as_deref());
    print_field("Expected outcome", d.expected_outcome.as_deref());
    print_field("Reflection", d.reflection.as_deref());
    if !d.tags.is_empty() {
        println!("Tags:             {}", d.tags.join(", "));
    }

    let chats = storage
        .get_chat_history(owner, &ChatFilter::for_decision(&d.id))
        .context("failed to load linked conversation")?;
    if !chats.is_empty() {
        println!();
        println!("Conversation ({} exchange(s)):", chats.len());
        for c in &chats {
            println!("  You: {}", c.user_message);
            println!("  AI:  {}", c.ai_response);
        }
    }
    Ok(())
}

fn print_field(label: &str, value: Option<&str>) {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        println!("{:<18}{v}", format!("{label}:"));
    }
}

fn print_list(label: &str, values: &[String]) {
    if !values.is_empty() {
        println!("{label}:");
        for v in values {
            println!("  - {v}");
        }
    }
}

/// Delete a decision after confirmation (skipped with `yes`).
pub fn delete(storage: &dyn StorageBackend, owner: &RecordId, id: &str, yes: bool) -> Result<()> {
    let Some(d) = storage.get_decision(owner, id).context("failed to load decision")? else {
        bail!("no decision {id}");
    };

    if !yes && !confirm(&format!("Delete \"{}\"?", d.title.as_deref().unwrap_or("Untitled")))? {
        bail!("delete cancelled");
    }

    if !storage.delete_decision(owner, id).context("failed to delete decision")? {
        bail!("no decision {id}");
    }
    println!("Decision {id} deleted.");
    Ok(())
}

/// Record an outcome status, optionally with a reflection.
pub fn set_status(
    storage: &dyn StorageBackend,
    owner: &RecordId,
    id: &str,
    status: &str,
    reflection: Option<String>,
) -> Result<()> {
    let Some(d) = storage.get_decision(owner, id).context("failed to load decision")? else {
        bail!("no decision {id}");
    };

    let mut update = DecisionInput::from(&d);
    update.outcome_status = Some(status.to_string());
    if reflection.is_some() {
        update.reflection = reflection;
    }
    storage
        .save_decision(owner, &update)
        .context("failed to update decision")?;

    println!("Decision {id} marked {status}.");
    Ok(())
}
