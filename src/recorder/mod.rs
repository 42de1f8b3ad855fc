//! Conversational slot filling for one decision.
//!
//! A [`DecisionRecorder`] talks to a [`CompletionProvider`] until the six
//! required fields of a [`DecisionDraft`] are filled. Values arrive two ways:
//!
//! 1. Per reply: the model appends a `[FIELDS]` block that is parsed, applied
//!    (overwriting earlier values) and stripped before the user sees the reply.
//! 2. Reconciliation: the whole transcript is re-read and any field still empty
//!    is filled. Reconciliation never overwrites.
//!
//! [`RecordingSession`] wraps a recorder with language switching, save
//! commands and persistence.

pub mod extract;
pub mod prompts;
pub mod session;

pub use session::{RecordingSession, Turn, TurnOutcome};

use std::sync::Arc;

use crate::assistant::{AssistantError, ChatTurn, CompletionProvider, Role};
use crate::language::Language;
use crate::storage::types::{DecisionInput, DEFAULT_MEMORY_LAYER, DEFAULT_OUTCOME_STATUS};

/// Longest title derived from a description, in characters.
pub const TITLE_MAX_CHARS: usize = 100;

/// A slot in a [`DecisionDraft`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Description,
    Goal,
    Constraints,
    Alternatives,
    FinalChoice,
    Reasoning,
    ExpectedOutcome,
}

impl Field {
    /// Fields that must be filled before a decision can be saved, in asking order.
    pub const REQUIRED: [Field; 6] = [
        Field::Description,
        Field::Goal,
        Field::Constraints,
        Field::Alternatives,
        Field::FinalChoice,
        Field::Reasoning,
    ];

    pub const ALL: [Field; 7] = [
        Field::Description,
        Field::Goal,
        Field::Constraints,
        Field::Alternatives,
        Field::FinalChoice,
        Field::Reasoning,
        Field::ExpectedOutcome,
    ];

    /// Stored field name.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Goal => "goal",
            Self::Constraints => "constraints",
            Self::Alternatives => "alternatives",
            Self::FinalChoice => "final_choice",
            Self::Reasoning => "reasoning",
            Self::ExpectedOutcome => "expected_outcome",
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Self::Constraints | Self::Alternatives)
    }

    pub fn is_required(&self) -> bool {
        !matches!(self, Self::ExpectedOutcome)
    }

    /// Human-readable name in `language`.
    pub fn label(&self, language: Language) -> &'static str {
        match (language, self) {
            (Language::English, Self::Description) => "Decision description",
            (Language::English, Self::Goal) => "Goal",
            (Language::English, Self::Constraints) => "Constraints",
            (Language::English, Self::Alternatives) => "Alternatives considered",
            (Language::English, Self::FinalChoice) => "Final choice",
            (Language::English, Self::Reasoning) => "Reasoning",
            (Language::English, Self::ExpectedOutcome) => "Expected outcome",
            (Language::Hindi, Self::Description) => "निर्णय का विवरण",
            (Language::Hindi, Self::Goal) => "लक्ष्य",
            (Language::Hindi, Self::Constraints) => "बाधाएँ",
            (Language::Hindi, Self::Alternatives) => "विकल्प",
            (Language::Hindi, Self::FinalChoice) => "अंतिम चुनाव",
            (Language::Hindi, Self::Reasoning) => "कारण",
            (Language::Hindi, Self::ExpectedOutcome) => "अपेक्षित परिणाम",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for Field {
    type Err = String;

    /// Accepts stored names case-insensitively, with spaces or hyphens in place
    /// of underscores, plus a few common synonyms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "description" | "decision" => Ok(Self::Description),
            "goal" | "goals" => Ok(Self::Goal),
            "constraints" | "constraint" => Ok(Self::Constraints),
            "alternatives" | "alternative" | "options" => Ok(Self::Alternatives),
            "final_choice" | "choice" => Ok(Self::FinalChoice),
            "reasoning" | "reason" => Ok(Self::Reasoning),
            "expected_outcome" | "outcome" => Ok(Self::ExpectedOutcome),
            _ => Err(format!("unknown field: {s}")),
        }
    }
}

/// The partially filled decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionDraft {
    pub description: Option<String>,
    pub goal: Option<String>,
    pub constraints: Vec<String>,
    pub alternatives: Vec<String>,
    pub final_choice: Option<String>,
    pub reasoning: Option<String>,
    pub expected_outcome: Option<String>,
}

impl DecisionDraft {
    fn text_slot(&mut self, field: Field) -> Option<&mut Option<String>> {
        match field {
            Field::Description => Some(&mut self.description),
            Field::Goal => Some(&mut self.goal),
            Field::FinalChoice => Some(&mut self.final_choice),
            Field::Reasoning => Some(&mut self.reasoning),
            Field::ExpectedOutcome => Some(&mut self.expected_outcome),
            Field::Constraints | Field::Alternatives => None,
        }
    }

    fn text(&self, field: Field) -> Option<&str> {
        match field {
            Field::Description => self.description.as_deref(),
            Field::Goal => self.goal.as_deref(),
            Field::FinalChoice => self.final_choice.as_deref(),
            Field::Reasoning => self.reasoning.as_deref(),
            Field::ExpectedOutcome => self.expected_outcome.as_deref(),
            Field::Constraints | Field::Alternatives => None,
        }
    }

    fn list(&self, field: Field) -> &[String] {
        match field {
            Field::Constraints => &self.constraints,
            Field::Alternatives => &self.alternatives,
            _ => &[],
        }
    }

    /// Non-blank string, or non-empty list.
    pub fn is_filled(&self, field: Field) -> bool {
        if field.is_list() {
            !self.list(field).is_empty()
        } else {
            self.text(field).is_some_and(|v| !v.trim().is_empty())
        }
    }

    /// Apply a raw value. With `overwrite` false a filled field is left alone.
    /// Returns whether the field changed.
    pub fn set(&mut self, field: Field, raw: &str, overwrite: bool) -> bool {
        if !overwrite && self.is_filled(field) {
            return false;
        }
        if extract::is_placeholder(raw) {
            return false;
        }
        match field {
            Field::Constraints | Field::Alternatives => {
                let items = extract::split_list(raw);
                if items.is_empty() {
                    return false;
                }
                let slot = if field == Field::Constraints {
                    &mut self.constraints
                } else {
                    &mut self.alternatives
                };
                if *slot == items {
                    return false;
                }
                *slot = items;
                true
            }
            _ => {
                let value = raw.trim().to_string();
                match self.text_slot(field) {
                    Some(slot) if slot.as_deref() != Some(value.as_str()) => {
                        *slot = Some(value);
                        true
                    }
                    _ => false,
                }
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        Field::REQUIRED.iter().all(|f| self.is_filled(*f))
    }

    /// Required fields still empty, in asking order.
    pub fn missing_fields(&self) -> Vec<Field> {
        Field::REQUIRED
            .into_iter()
            .filter(|f| !self.is_filled(*f))
            .collect()
    }

    /// `key: value` lines for every filled field.
    pub fn summary(&self) -> String {
        Field::ALL
            .iter()
            .filter(|f| self.is_filled(**f))
            .map(|f| {
                let value = if f.is_list() {
                    self.list(*f).join("; ")
                } else {
                    self.text(*f).unwrap_or_default().to_string()
                };
                format!("{}: {}", f.key(), value)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The save payload: title from the first [`TITLE_MAX_CHARS`] characters
    /// of the description, private, pending.
    pub fn to_decision_input(&self) -> DecisionInput {
        let title = self
            .description
            .as_deref()
            .map(|d| d.trim().chars().take(TITLE_MAX_CHARS).collect::<String>())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Untitled".to_string());

        DecisionInput {
            id: None,
            title: Some(title),
            description: self.description.clone(),
            goal: self.goal.clone(),
            constraints: self.constraints.clone(),
            alternatives: self.alternatives.clone(),
            final_choice: self.final_choice.clone(),
            reasoning: self.reasoning.clone(),
            expected_outcome: self.expected_outcome.clone(),
            memory_layer: Some(DEFAULT_MEMORY_LAYER.to_string()),
            tags: Vec::new(),
            reflection: None,
            outcome_status: Some(DEFAULT_OUTCOME_STATUS.to_string()),
        }
    }
}

pub struct DecisionRecorder {
    provider: Arc<dyn CompletionProvider>,
    language: Language,
    draft: DecisionDraft,
    transcript: Vec<ChatTurn>,
}

impl DecisionRecorder {
    pub fn new(provider: Arc<dyn CompletionProvider>, language: Language) -> Self {
        Self {
            provider,
            language,
            draft: DecisionDraft::default(),
            transcript: Vec::new(),
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn draft(&self) -> &DecisionDraft {
        &self.draft
    }

    pub fn transcript(&self) -> &[ChatTurn] {
        &self.transcript
    }

    /// Emit the opening prompt and record it as the first assistant turn.
    pub fn start_conversation(&mut self) -> String {
        let opening = prompts::opening(self.language).to_string();
        self.transcript.push(ChatTurn::assistant(opening.clone()));
        opening
    }

    /// Get the assistant's reply to `utterance`.
    ///
    /// On success the reply's field block is applied and stripped and both
    /// turns join the transcript. On failure nothing changes.
    pub fn respond(&mut self, utterance: &str) -> Result<String, AssistantError> {
        let mut turns = Vec::with_capacity(self.transcript.len() + 2);
        turns.push(ChatTurn::system(prompts::system_prompt(self.language, &self.draft)));
        turns.extend(self.transcript.iter().cloned());
        turns.push(ChatTurn::user(utterance));

        let raw = self.provider.complete(&turns)?;
        let (visible, values) = extract::split_field_block(&raw);

        let mut changed = 0;
        for v in &values {
            if self.draft.set(v.field, &v.value, true) {
                changed += 1;
            }
        }
        tracing::debug!(extracted = values.len(), changed, "reply fields applied");

        let reply = if visible.is_empty() {
            prompts::next_question(self.language, &self.draft)
        } else {
            visible
        };
        self.record_exchange(utterance, &reply);
        Ok(reply)
    }

    /// Append an exchange the recorder did not generate (fallback replies,
    /// save-command answers).
    pub fn record_exchange(&mut self, user: &str, assistant: &str) {
        self.transcript.push(ChatTurn::user(user));
        self.transcript.push(ChatTurn::assistant(assistant));
    }

    /// Re-read the whole transcript and fill fields that are still empty.
    /// Returns how many were filled. Safe to repeat.
    pub fn reconcile(&mut self) -> Result<usize, AssistantError> {
        if self.draft.is_complete() && self.draft.is_filled(Field::ExpectedOutcome) {
            return Ok(0);
        }
        let transcript_text = self
            .transcript
            .iter()
            .filter(|t| t.role != Role::System)
            .map(|t| format!("{}: {}", t.role.as_str(), t.content))
            .collect::<Vec<_>>()
            .join("\n");

        let reply = self.provider.complete(&[
            ChatTurn::system(prompts::EXTRACTION_SYSTEM_PROMPT),
            ChatTurn::user(prompts::extraction_prompt(&transcript_text)),
        ])?;

        let filled = extract::parse_extraction(&reply)
            .into_iter()
            .filter(|v| self.draft.set(v.field, &v.value, false))
            .count();
        if filled > 0 {
            tracing::debug!(filled, "reconciliation filled empty fields");
        }
        Ok(filled)
    }

    pub fn is_complete(&self) -> bool {
        self.draft.is_complete()
    }

    pub fn missing_fields(&self) -> Vec<Field> {
        self.draft.missing_fields()
    }

    /// Every user turn paired with the assistant turn right after it.
    pub fn exchange_pairs(&self) -> Vec<(String, String)> {
        self.transcript
            .windows(2)
            .filter(|w| w[0].role == Role::User && w[1].role == Role::Assistant)
            .map(|w| (w[0].content.clone(), w[1].content.clone()))
            .collect()
    }
}
