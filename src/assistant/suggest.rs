//! Assistants that work over already-recorded decisions.

use std::sync::Arc;

use super::{AssistantError, ChatTurn, CompletionProvider};
use crate::storage::types::{Decision, Preferences, RecordId};
use crate::storage::{StorageBackend, StorageResult};

/// How many recent decisions the suggestion engine reads.
pub const RECENT_DECISIONS: usize = 10;

const SUGGESTION_SYSTEM_PROMPT: &str = "You are NeuroLinker, a thoughtful decision coach. \
Give concrete, practical suggestions grounded in the user's own past decisions when they are provided. \
Be concise and reply in the language the user writes in.";

const PRIVATE_NOTE: &str = "The user has not shared their decision history. \
Answer from the question alone and do not assume anything about their past decisions.";

/// Render decisions as the plain-text history the assistants read.
pub fn decision_history_text(decisions: &[Decision]) -> String {
    let mut out = String::new();
    for (i, d) in decisions.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!(
            "Decision {}: {} ({}, {})\n",
            i + 1,
            d.title.as_deref().unwrap_or("Untitled"),
            d.created_at.format("%Y-%m-%d"),
            d.outcome_status,
        ));
        push_line(&mut out, "Description", d.description.as_deref());
        push_line(&mut out, "Goal", d.goal.as_deref());
        push_list(&mut out, "Constraints", &d.constraints);
        push_list(&mut out, "Alternatives", &d.alternatives);
        push_line(&mut out, "Final choice", d.final_choice.as_deref());
        push_line(&mut out, "Reasoning", d.reasoning.as_deref());
        push_line(&mut out, "Expected outcome", d.expected_outcome.as_deref());
        push_line(&mut out, "Reflection", d.reflection.as_deref());
    }
    out
}

fn push_line(out: &mut String, label: &str, value: Option<&str>) {
    if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
        out.push_str(&format!("- {label}: {v}\n"));
    }
}

fn push_list(out: &mut String, label: &str, values: &[String]) {
    if !values.is_empty() {
        out.push_str(&format!("- {label}: {}\n", values.join(", ")));
    }
}

/// Conversational suggestions for one user.
///
/// Decision history reaches the model only when the user's
/// `share_data_with_ai` preference is on.
pub struct SuggestionEngine {
    provider: Arc<dyn CompletionProvider>,
    decisions: Vec<Decision>,
    share_history: bool,
    conversation: Vec<ChatTurn>,
}

impl SuggestionEngine {
    pub fn new(provider: Arc<dyn CompletionProvider>, decisions: Vec<Decision>, preferences: Preferences) -> Self {
        Self {
            provider,
            decisions,
            share_history: preferences.share_data_with_ai,
            conversation: Vec::new(),
        }
    }

    /// Build an engine from the user's stored decisions and preferences.
    pub fn for_user(
        storage: &dyn StorageBackend,
        provider: Arc<dyn CompletionProvider>,
        owner: &RecordId,
    ) -> StorageResult<Self> {
        let decisions = storage.get_user_decisions(owner, Some(RECENT_DECISIONS))?;
        let preferences = storage.get_user_preferences(owner)?;
        tracing::debug!(user_id = %owner, decisions = decisions.len(), share = preferences.share_data_with_ai, "suggestion engine loaded");
        Ok(Self::new(provider, decisions, preferences))
    }

    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    /// Greeting shown before the first question. Never calls the model.
    pub fn opening(&self) -> String {
        match self.decisions.first() {
            None => "You haven't recorded any decisions yet. Record one and I can suggest how to build on it. \
                     Meanwhile, ask me anything about a choice you're facing."
                .to_string(),
            Some(latest) => format!(
                "You have {} recorded decision(s); the most recent is \"{}\". \
                 Ask me for suggestions, patterns or next steps.",
                self.decisions.len(),
                latest.title.as_deref().unwrap_or("Untitled"),
            ),
        }
    }

    fn context_turn(&self) -> ChatTurn {
        if self.share_history && !self.decisions.is_empty() {
            ChatTurn::system(format!(
                "{SUGGESTION_SYSTEM_PROMPT}\n\nThe user's recent decisions:\n{}",
                decision_history_text(&self.decisions)
            ))
        } else {
            ChatTurn::system(format!("{SUGGESTION_SYSTEM_PROMPT}\n\n{PRIVATE_NOTE}"))
        }
    }

    /// Answer a question, keeping the conversation for follow-ups. A failed
    /// call leaves the conversation unchanged.
    pub fn ask(&mut self, question: &str) -> Result<String, AssistantError> {
        let mut turns = Vec::with_capacity(self.conversation.len() + 2);
        turns.push(self.context_turn());
        turns.extend(self.conversation.iter().cloned());
        turns.push(ChatTurn::user(question));

        let answer = self.provider.complete(&turns)?;
        self.conversation.push(ChatTurn::user(question));
        self.conversation.push(ChatTurn::assistant(answer.clone()));
        Ok(answer)
    }

    /// Recurring patterns across the user's decisions.
    pub fn pattern_analysis(&self) -> Result<String, AssistantError> {
        if !self.share_history {
            return Err(AssistantError::Disabled(
                "decision history is not shared with the assistant".into(),
            ));
        }
        self.provider.complete(&[
            ChatTurn::system(SUGGESTION_SYSTEM_PROMPT),
            ChatTurn::user(format!(
                "Analyze these decisions for recurring patterns in goals, constraints and reasoning. \
                 Point out strengths and blind spots.\n\n{}",
                decision_history_text(&self.decisions)
            )),
        ])
    }

    /// Deep dive into a single decision the user picked.
    pub fn analyze_decision(&self, decision: &Decision) -> Result<String, AssistantError> {
        self.provider.complete(&[
            ChatTurn::system(SUGGESTION_SYSTEM_PROMPT),
            ChatTurn::user(format!(
                "Review this decision. Assess the reasoning, note any risks the alternatives reveal, \
                 and suggest what to watch for.\n\n{}",
                decision_history_text(std::slice::from_ref(decision))
            )),
        ])
    }
}

/// One-shot reflection over a decision history.
pub struct ReflectionAssistant {
    provider: Arc<dyn CompletionProvider>,
}

impl ReflectionAssistant {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    pub fn reflect(&self, decision_history: &str) -> Result<String, AssistantError> {
        if decision_history.trim().is_empty() {
            return Err(AssistantError::EmptyResponse);
        }
        self.provider.complete(&[ChatTurn::user(decision_history)])
    }
}
