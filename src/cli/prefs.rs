use anyhow::{Context, Result};

use neurolinker::storage::types::{PreferencesUpdate, RecordId};
use neurolinker::storage::StorageBackend;

/// Print the user's privacy preferences.
pub fn show(storage: &dyn StorageBackend, owner: &RecordId) -> Result<()> {
    let prefs = storage
        .get_user_preferences(owner)
        .context("failed to load preferences")?;
    println!("Preferences");
    println!("{}", "=".repeat(40));
    println!("  Share data with AI:   {}", on_off(prefs.share_data_with_ai));
    println!("  View chat history:    {}", on_off(prefs.view_chat_history));
    Ok(())
}

/// Change the given preferences; the rest keep their value.
pub fn set(storage: &dyn StorageBackend, owner: &RecordId, update: PreferencesUpdate) -> Result<()> {
    if update == PreferencesUpdate::default() {
        println!("Nothing to change.");
        return Ok(());
    }
    storage
        .update_user_preferences(owner, &update)
        .context("failed to update preferences")?;
    show(storage, owner)
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}
