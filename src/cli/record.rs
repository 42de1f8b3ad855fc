//! CLI `record` command: interactive decision recording on stdin.

use std::sync::Arc;

use anyhow::Result;

use neurolinker::assistant::CompletionProvider;
use neurolinker::config::RecorderConfig;
use neurolinker::language::Language;
use neurolinker::recorder::{RecordingSession, TurnOutcome};
use neurolinker::storage::types::RecordId;
use neurolinker::storage::StorageBackend;

use super::prompt_line;

/// Run a recording conversation until end of input or `/quit`.
///
/// `/new` discards the current draft, `/status` shows what is collected.
pub fn record(
    storage: Arc<dyn StorageBackend>,
    provider: Arc<dyn CompletionProvider>,
    owner: RecordId,
    config: RecorderConfig,
    language: Language,
) -> Result<()> {
    let mut session = RecordingSession::new(storage, provider, owner, config, language);

    println!("{}", session.start());
    println!("(type 'save' when done, /status to review, /new to start over, /quit to leave)");

    while let Some(line) = prompt_line("\n> ")? {
        match line.as_str() {
            "/quit" | "/exit" => break,
            "/new" => {
                let language = session.language();
                println!("{}", session.reset(language));
                continue;
            }
            "/status" => {
                print_status(&session);
                continue;
            }
            _ => {}
        }

        // Storage failures leave the draft in place so the user can retry.
        let turn = match session.handle_input(&line) {
            Ok(turn) => turn,
            Err(e) => {
                tracing::warn!(error = %e, "recording turn failed");
                eprintln!("Could not save: {e}. Your answers are kept; try again.");
                continue;
            }
        };

        if let Some(opening) = turn.opening {
            println!("[{}] {opening}", session.language());
        }
        match turn.outcome {
            TurnOutcome::Ignored => {}
            TurnOutcome::Reply { text, degraded } => {
                if degraded {
                    println!("(assistant offline)");
                }
                println!("{text}");
            }
            TurnOutcome::Incomplete { message, .. } => println!("{message}"),
            TurnOutcome::Saved {
                decision_id,
                exchanges,
                message,
            } => {
                println!("{message}");
                println!("  Decision id: {decision_id} ({exchanges} exchange(s) linked)");
                println!();
                println!("{}", session.start());
            }
        }
    }

    Ok(())
}

fn print_status(session: &RecordingSession) {
    let recorder = session.recorder();
    let summary = recorder.draft().summary();
    println!("Collected:");
    if summary.is_empty() {
        println!("  (nothing yet)");
    } else {
        for line in summary.lines() {
            println!("  {line}");
        }
    }
    let missing = recorder.missing_fields();
    if missing.is_empty() {
        println!("Ready to save.");
    } else {
        let names: Vec<&str> = missing.iter().map(|f| f.label(session.language())).collect();
        println!("Still needed: {}", names.join(", "));
    }
}
