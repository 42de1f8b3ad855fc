//! One user's recording conversation against a storage handle.

use std::sync::Arc;

use super::{prompts, DecisionRecorder, Field};
use crate::assistant::{CompletionProvider, Transcriber};
use crate::config::RecorderConfig;
use crate::language::{detect_language, Language};
use crate::storage::types::{ChatEntry, RecordId};
use crate::storage::{StorageBackend, StorageError, StorageResult};

/// Inputs that ask for the decision to be saved.
pub const SAVE_COMMANDS: &[&str] = &[
    "save",
    "save decision",
    "save now",
    "save my decision",
    "done",
    "submit",
    "पूरा",
    "save करो",
    "हो गया",
];

/// Whole input, or a prefix followed by a non-alphanumeric character, equal to
/// a save command (case-insensitive). "save it" and "done." match, "doneness"
/// does not.
pub fn is_save_command(input: &str) -> bool {
    let input = input.trim().to_lowercase();
    SAVE_COMMANDS.iter().any(|cmd| match input.strip_prefix(cmd) {
        Some(rest) => rest.chars().next().map_or(true, |c| !c.is_alphanumeric()),
        None => false,
    })
}

/// What one input produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    /// A fresh opening, present when the input switched language.
    pub opening: Option<String>,
    pub outcome: TurnOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Blank input or nothing transcribed.
    Ignored,
    /// Assistant reply. `degraded` when the model failed and a canned reply
    /// was used instead.
    Reply { text: String, degraded: bool },
    /// Save command with every required field present.
    Saved {
        decision_id: String,
        exchanges: usize,
        message: String,
    },
    /// Save command while required fields are still missing.
    Incomplete { missing: Vec<Field>, message: String },
}

pub struct RecordingSession {
    storage: Arc<dyn StorageBackend>,
    provider: Arc<dyn CompletionProvider>,
    owner: RecordId,
    config: RecorderConfig,
    recorder: DecisionRecorder,
}

impl RecordingSession {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        provider: Arc<dyn CompletionProvider>,
        owner: RecordId,
        config: RecorderConfig,
        language: Language,
    ) -> Self {
        let recorder = DecisionRecorder::new(provider.clone(), language);
        Self {
            storage,
            provider,
            owner,
            config,
            recorder,
        }
    }

    pub fn recorder(&self) -> &DecisionRecorder {
        &self.recorder
    }

    pub fn language(&self) -> Language {
        self.recorder.language()
    }

    /// Opening prompt for the current recorder.
    pub fn start(&mut self) -> String {
        self.recorder.start_conversation()
    }

    /// Drop the current draft and begin again in `language`. Returns the new
    /// opening.
    pub fn reset(&mut self, language: Language) -> String {
        self.recorder = DecisionRecorder::new(self.provider.clone(), language);
        self.recorder.start_conversation()
    }

    /// Process one typed or transcribed input.
    ///
    /// Only storage failures are errors; model failures degrade to a canned
    /// reply.
    pub fn handle_input(&mut self, input: &str) -> StorageResult<Turn> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(Turn { opening: None, outcome: TurnOutcome::Ignored });
        }

        // Save commands are mixed-script ("save करो") and never switch language
        if is_save_command(input) {
            let outcome = self.handle_save(input)?;
            return Ok(Turn { opening: None, outcome });
        }

        // A language switch replaces the recorder before the input is handled
        let detected = detect_language(input);
        let opening = if detected != self.recorder.language() {
            tracing::info!(from = %self.recorder.language(), to = %detected, "conversation language changed, restarting recorder");
            Some(self.reset(detected))
        } else {
            None
        };

        let outcome = self.handle_utterance(input)?;

        Ok(Turn { opening, outcome })
    }

    /// Transcribe once and handle the result like typed input. Transcription
    /// failures and silence are ignored.
    pub fn handle_voice(&mut self, transcriber: &dyn Transcriber) -> StorageResult<Turn> {
        match transcriber.transcribe() {
            Ok(Some(text)) => self.handle_input(&text),
            Ok(None) => Ok(Turn { opening: None, outcome: TurnOutcome::Ignored }),
            Err(e) => {
                tracing::warn!(error = %e, "voice transcription failed");
                Ok(Turn { opening: None, outcome: TurnOutcome::Ignored })
            }
        }
    }

    fn handle_utterance(&mut self, input: &str) -> StorageResult<TurnOutcome> {
        let language = self.recorder.language();
        let (text, degraded) = match self.recorder.respond(input) {
            Ok(reply) => (reply, false),
            Err(e) => {
                tracing::warn!(error = %e, "assistant reply failed, using fallback");
                let reply = prompts::fallback_reply(language, self.recorder.draft());
                self.recorder.record_exchange(input, &reply);
                (reply, true)
            }
        };

        if !degraded && self.recorder.transcript().len() >= self.config.reconcile_after_messages {
            if let Err(e) = self.recorder.reconcile() {
                tracing::debug!(error = %e, "reconciliation skipped");
            }
        }

        self.storage
            .save_chat_message(&self.owner, &ChatEntry::new(input, text.clone()))?;

        Ok(TurnOutcome::Reply { text, degraded })
    }

    fn handle_save(&mut self, input: &str) -> StorageResult<TurnOutcome> {
        let language = self.recorder.language();

        if !self.recorder.is_complete() {
            let missing = self.recorder.missing_fields();
            let message = prompts::missing_fields_message(language, &missing);
            self.recorder.record_exchange(input, &message);
            tracing::debug!(missing = missing.len(), "save requested before decision was complete");
            return Ok(TurnOutcome::Incomplete { missing, message });
        }

        // 1. Persist and verify
        let decision_input = self.recorder.draft().to_decision_input();
        let decision_id = self.storage.save_decision(&self.owner, &decision_input)?;
        if self.storage.get_decision(&self.owner, &decision_id)?.is_none() {
            return Err(StorageError::NotPersisted(decision_id));
        }

        // 2. Link the conversation; one failed message does not undo the save
        let mut exchanges = 0;
        for (user, assistant) in self.recorder.exchange_pairs() {
            let entry = ChatEntry::new(user, assistant)
                .linked_to(decision_id.clone())
                .hidden();
            match self.storage.save_chat_message(&self.owner, &entry) {
                Ok(_) => exchanges += 1,
                Err(e) => tracing::warn!(error = %e, decision_id = %decision_id, "failed to link chat exchange"),
            }
        }

        tracing::info!(decision_id = %decision_id, exchanges, "decision saved");

        // 3. Fresh recorder for the next decision
        self.recorder = DecisionRecorder::new(self.provider.clone(), language);

        Ok(TurnOutcome::Saved {
            decision_id,
            exchanges,
            message: prompts::saved_message(language).to_string(),
        })
    }
}
