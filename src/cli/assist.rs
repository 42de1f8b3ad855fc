//! CLI `suggest` and `reflect` commands.

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use neurolinker::assistant::suggest::{decision_history_text, ReflectionAssistant, SuggestionEngine};
use neurolinker::assistant::{AssistantError, CompletionProvider};
use neurolinker::storage::types::{ChatEntry, RecordId};
use neurolinker::storage::StorageBackend;

use super::prompt_line;

/// Chat type for suggestion exchanges.
const SUGGESTION: &str = "suggestion";
/// Chat type for reflections.
const REFLECTION: &str = "reflection";

#[derive(Debug, Clone, Default)]
pub struct SuggestOptions {
    /// Answer one question and exit instead of starting a conversation.
    pub question: Option<String>,
    pub patterns: bool,
    pub decision_id: Option<String>,
}

/// Suggestions over the user's recent decisions.
pub fn suggest(
    storage: &dyn StorageBackend,
    provider: Arc<dyn CompletionProvider>,
    owner: &RecordId,
    opts: &SuggestOptions,
) -> Result<()> {
    let mut engine = SuggestionEngine::for_user(storage, provider, owner)
        .context("failed to load decisions")?;

    if opts.patterns {
        println!("{}", reply_or_notice(engine.pattern_analysis())?);
        return Ok(());
    }

    if let Some(ref id) = opts.decision_id {
        let Some(decision) = storage.get_decision(owner, id).context("failed to load decision")? else {
            bail!("no decision {id}");
        };
        println!("{}", reply_or_notice(engine.analyze_decision(&decision))?);
        return Ok(());
    }

    if let Some(ref question) = opts.question {
        let answer = reply_or_notice(engine.ask(question))?;
        println!("{answer}");
        storage.save_chat_message(owner, &ChatEntry::new(question.as_str(), answer).chat_type(SUGGESTION))?;
        return Ok(());
    }

    println!("{}", engine.opening());
    while let Some(line) = prompt_line("\n> ")? {
        if line.is_empty() {
            continue;
        }
        if line == "/quit" || line == "/exit" {
            break;
        }
        match engine.ask(&line) {
            Ok(answer) => {
                println!("{answer}");
                storage.save_chat_message(owner, &ChatEntry::new(line.as_str(), answer).chat_type(SUGGESTION))?;
            }
            Err(e) => println!("(assistant unavailable: {e})"),
        }
    }
    Ok(())
}

/// Reflect over the user's whole decision history.
pub fn reflect(
    storage: &dyn StorageBackend,
    provider: Arc<dyn CompletionProvider>,
    owner: &RecordId,
) -> Result<()> {
    let decisions = storage
        .get_user_decisions(owner, None)
        .context("failed to load decisions")?;
    if decisions.is_empty() {
        println!("No decisions to reflect on yet.");
        return Ok(());
    }

    let history = decision_history_text(&decisions);
    let prompt = format!(
        "Here is my decision history. Reflect on it: what patterns do you see, \
         what did I do well, and what should I consider next time?\n\n{history}"
    );
    let reflection = reply_or_notice(ReflectionAssistant::new(provider).reflect(&prompt))?;
    println!("{reflection}");
    storage.save_chat_message(
        owner,
        &ChatEntry::new("Reflect on my decisions", reflection).chat_type(REFLECTION),
    )?;
    Ok(())
}

/// Disabled assistants are a user-facing notice; other failures are errors.
fn reply_or_notice(result: Result<String, AssistantError>) -> Result<String> {
    match result {
        Ok(text) => Ok(text),
        Err(AssistantError::Disabled(reason)) => {
            bail!("assistant disabled ({reason}); set the API key named in [assistant] api_key_env")
        }
        Err(e) => Err(e).context("assistant request failed"),
    }
}
