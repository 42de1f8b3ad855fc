use anyhow::Result;
use serde::Serialize;

use neurolinker::storage::types::{ChatFilter, ChatMessage, Decision, Preferences, RecordId, User};
use neurolinker::storage::StorageBackend;

/// Export format: everything one user owns.
#[derive(Debug, Serialize)]
struct ExportData {
    user: User,
    preferences: Preferences,
    decisions: Vec<Decision>,
    chat_history: Vec<ChatMessage>,
}

/// Export the signed-in user's journal as JSON to stdout.
pub fn export(storage: &dyn StorageBackend, user: User) -> Result<()> {
    let owner: RecordId = user.id.clone();
    let preferences = storage.get_user_preferences(&owner)?;
    let decisions = storage.get_user_decisions(&owner, None)?;
    let chat_history = storage.get_chat_history(
        &owner,
        &ChatFilter {
            include_hidden: true,
            ..Default::default()
        },
    )?;

    let data = ExportData {
        user,
        preferences,
        decisions,
        chat_history,
    };

    let json = serde_json::to_string_pretty(&data)?;
    println!("{json}");

    eprintln!(
        "Exported {} decisions and {} chat messages.",
        data.decisions.len(),
        data.chat_history.len()
    );

    Ok(())
}
