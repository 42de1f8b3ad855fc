//! Journal statistics computed from a user's decisions and chat history.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::storage::types::{ChatFilter, ChatMessage, Decision, RecordId};
use crate::storage::{StorageBackend, StorageResult};

/// Characters of a title used as its category.
const CATEGORY_CHARS: usize = 20;

/// Summary of a user's journal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionStats {
    pub total_decisions: usize,
    pub completed: usize,
    pub pending: usize,
    pub by_status: BTreeMap<String, usize>,
    pub avg_constraints: f64,
    pub categories: BTreeMap<String, usize>,
    /// Visible chat exchanges.
    pub conversations: usize,
    pub conversations_this_week: usize,
    /// 0–100, grows with recorded decisions and conversations.
    pub learning_level: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_decision: Option<String>,
}

/// Load the user's decisions and visible chats and summarize them.
pub fn decision_stats(storage: &dyn StorageBackend, owner: &RecordId) -> StorageResult<DecisionStats> {
    let decisions = storage.get_user_decisions(owner, None)?;
    let chats = storage.get_chat_history(owner, &ChatFilter::default())?;
    Ok(compute(&decisions, &chats, Utc::now()))
}

/// Pure summary over already-loaded records.
pub fn compute(decisions: &[Decision], chats: &[ChatMessage], now: DateTime<Utc>) -> DecisionStats {
    let mut by_status = BTreeMap::new();
    let mut categories = BTreeMap::new();
    let mut constraint_total = 0usize;

    for d in decisions {
        *by_status.entry(d.outcome_status.clone()).or_insert(0) += 1;
        let title = d.title.as_deref().unwrap_or("Other");
        let category: String = title.chars().take(CATEGORY_CHARS).collect();
        *categories.entry(category).or_insert(0) += 1;
        constraint_total += d.constraints.len();
    }

    let visible: Vec<&ChatMessage> = chats.iter().filter(|c| c.is_visible_to_user).collect();
    let week_ago = now - Duration::days(7);
    let conversations_this_week = visible.iter().filter(|c| c.timestamp > week_ago).count();

    let avg_constraints = if decisions.is_empty() {
        0.0
    } else {
        constraint_total as f64 / decisions.len() as f64
    };

    let learning_level = (decisions.len() * 10 + visible.len() * 2).min(100) as u32;

    DecisionStats {
        total_decisions: decisions.len(),
        completed: by_status.get("completed").copied().unwrap_or(0),
        pending: by_status.get("pending").copied().unwrap_or(0),
        by_status,
        avg_constraints,
        categories,
        conversations: visible.len(),
        conversations_this_week,
        learning_level,
        latest_decision: decisions
            .iter()
            .max_by_key(|d| d.created_at)
            .and_then(|d| d.title.clone()),
    }
}
