//! CLI `history` command: browse chat history.

use anyhow::{Context, Result};

use neurolinker::storage::types::{ChatFilter, ChatMessage, RecordId};
use neurolinker::storage::StorageBackend;

use super::truncate;

#[derive(Debug, Clone, Default)]
pub struct HistoryOptions {
    pub chat_type: Option<String>,
    pub decision_id: Option<String>,
    pub search: Option<String>,
    pub oldest_first: bool,
    pub include_hidden: bool,
    pub full: bool,
}

/// Print the user's chat history, newest first unless asked otherwise.
///
/// Respects the `view_chat_history` preference.
pub fn history(storage: &dyn StorageBackend, owner: &RecordId, opts: &HistoryOptions) -> Result<()> {
    let prefs = storage
        .get_user_preferences(owner)
        .context("failed to load preferences")?;
    if !prefs.view_chat_history {
        println!("Chat history is hidden. Enable it with `neurolinker prefs set --view-chat-history true`.");
        return Ok(());
    }

    let mut chats = storage
        .get_chat_history(owner, &chat_filter(opts))
        .context("failed to load chat history")?;

    if let Some(ref query) = opts.search {
        chats.retain(|c| matches_search(c, query));
    }
    if !opts.oldest_first {
        chats.reverse();
    }

    if chats.is_empty() {
        println!("No conversations found.");
        return Ok(());
    }

    println!("Showing {} conversation(s)", chats.len());
    for c in &chats {
        println!();
        println!("[{}] {}", c.timestamp.format("%Y-%m-%d %H:%M"), c.chat_type);
        if opts.full {
            println!("  You: {}", c.user_message);
            println!("  AI:  {}", c.ai_response);
        } else {
            println!("  You: {}", truncate(&c.user_message, 80));
            println!("  AI:  {}", truncate(&c.ai_response, 80));
        }
    }
    Ok(())
}

/// A decision's own conversation is stored hidden, so asking for one decision
/// always includes hidden messages.
fn chat_filter(opts: &HistoryOptions) -> ChatFilter {
    ChatFilter {
        decision_id: opts.decision_id.clone(),
        chat_type: opts.chat_type.clone(),
        include_hidden: opts.include_hidden || opts.decision_id.is_some(),
    }
}

/// Case-insensitive substring match on either side of the exchange.
fn matches_search(chat: &ChatMessage, query: &str) -> bool {
    let query = query.to_lowercase();
    chat.user_message.to_lowercase().contains(&query) || chat.ai_response.to_lowercase().contains(&query)
}
