mod helpers;

use helpers::{
    complete_reply, local_store, remote_store, signup, FixedTranscriber, ForgetfulStore, ScriptedProvider,
};
use neurolinker::config::RecorderConfig;
use neurolinker::language::Language;
use neurolinker::recorder::{Field, RecordingSession, TurnOutcome};
use neurolinker::storage::types::{ChatFilter, DECISION_RECORDING};
use neurolinker::storage::{StorageBackend, StorageError};
use std::sync::Arc;

fn session(
    storage: Arc<dyn StorageBackend>,
    provider: Arc<ScriptedProvider>,
    email: &str,
) -> RecordingSession {
    let owner = signup(storage.as_ref(), email);
    let mut session = RecordingSession::new(storage, provider, owner, RecorderConfig::default(), Language::English);
    session.start();
    session
}

#[test]
fn full_flow_saves_decision_and_links_conversation() {
    let (_tmp, storage) = local_store();
    let provider = ScriptedProvider::new([complete_reply()]);
    let mut s = session(storage.clone(), provider, "rec@x.com");
    let owner = storage.authenticate_user("rec@x.com", "secret").unwrap().unwrap();

    let turn = s.handle_input("I want to buy a bicycle to get to work").unwrap();
    assert!(turn.opening.is_none());
    match turn.outcome {
        TurnOutcome::Reply { text, degraded } => {
            assert!(!degraded);
            assert!(!text.contains("[FIELDS]"));
            assert!(text.starts_with("Thanks"));
        }
        other => panic!("expected a reply, got {other:?}"),
    }
    assert!(s.recorder().is_complete());

    let turn = s.handle_input("save").unwrap();
    let TurnOutcome::Saved { decision_id, exchanges, .. } = turn.outcome else {
        panic!("expected the decision to be saved");
    };
    assert_eq!(exchanges, 1);

    let d = storage.get_decision(&owner, &decision_id).unwrap().unwrap();
    assert_eq!(d.title.as_deref(), Some("Buy a bicycle for commuting"));
    assert_eq!(d.final_choice.as_deref(), Some("a folding bicycle"));
    assert_eq!(d.constraints, vec!["budget under 500", "storage in a small flat"]);
    assert_eq!(d.memory_layer, "private");
    assert_eq!(d.outcome_status, "pending");

    // One visible per-turn copy, one hidden copy linked to the decision.
    let visible = storage.get_chat_history(&owner, &ChatFilter::default()).unwrap();
    assert_eq!(visible.len(), 1);
    assert!(visible[0].decision_id.is_none());
    assert_eq!(visible[0].chat_type, DECISION_RECORDING);

    let linked = storage.get_chat_history_for_decision(&owner, &decision_id).unwrap();
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0].user_message, "I want to buy a bicycle to get to work");
    assert!(!linked[0].is_visible_to_user);

    // The decision's conversation carries its id.
    let filter = ChatFilter { decision_id: Some(decision_id.clone()), include_hidden: true, ..Default::default() };
    assert_eq!(storage.get_chat_history(&owner, &filter).unwrap().len(), 1);

    // Recorder starts over.
    assert!(s.recorder().draft().description.is_none());
}

#[test]
fn save_before_complete_lists_missing_fields() {
    let storage = remote_store();
    let mut s = session(storage.clone(), ScriptedProvider::offline(), "early@x.com");

    let turn = s.handle_input("done").unwrap();
    let TurnOutcome::Incomplete { missing, message } = turn.outcome else {
        panic!("expected incomplete");
    };
    assert_eq!(missing, Field::REQUIRED.to_vec());
    assert!(message.contains("Decision description"));

    let owner = storage.authenticate_user("early@x.com", "secret").unwrap().unwrap();
    assert!(storage.get_user_decisions(&owner, None).unwrap().is_empty());
}

#[test]
fn offline_assistant_degrades_but_keeps_the_conversation() {
    let (_tmp, storage) = local_store();
    let mut s = session(storage.clone(), ScriptedProvider::offline(), "off@x.com");
    let owner = storage.authenticate_user("off@x.com", "secret").unwrap().unwrap();

    let turn = s.handle_input("Should I change jobs?").unwrap();
    let TurnOutcome::Reply { text, degraded } = turn.outcome else {
        panic!("expected a reply");
    };
    assert!(degraded);
    assert!(text.contains("What decision are you facing?"));

    let history = storage.get_chat_history(&owner, &ChatFilter::default()).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].ai_response, text);
}

#[test]
fn switching_language_restarts_the_recorder() {
    let (_tmp, storage) = local_store();
    let provider = ScriptedProvider::new([
        "Tell me more.\n[FIELDS]\ngoal: save money\n[/FIELDS]",
        "ठीक है, आगे बताइए।",
    ]);
    let mut s = session(storage, provider, "lang@x.com");

    s.handle_input("I want to save money on rent").unwrap();
    assert!(s.recorder().draft().goal.is_some());

    let turn = s.handle_input("मुझे नई नौकरी लेनी चाहिए या नहीं").unwrap();
    assert_eq!(s.language(), Language::Hindi);
    let opening = turn.opening.expect("a fresh opening in Hindi");
    assert!(opening.starts_with("नमस्ते"));
    assert!(s.recorder().draft().goal.is_none(), "draft is reset on language change");
    assert!(matches!(turn.outcome, TurnOutcome::Reply { degraded: false, .. }));
}

#[test]
fn mixed_script_save_command_keeps_the_draft() {
    let (_tmp, storage) = local_store();
    let provider = ScriptedProvider::new([complete_reply()]);
    let mut s = session(storage, provider, "mixed@x.com");

    s.handle_input("I want a bicycle").unwrap();
    let turn = s.handle_input("save करो").unwrap();
    assert!(turn.opening.is_none());
    assert!(matches!(turn.outcome, TurnOutcome::Saved { .. }));
}

#[test]
fn reconciliation_fills_what_replies_missed() {
    let (_tmp, storage) = local_store();
    let provider = ScriptedProvider::new([
        "Noted.\n[FIELDS]\ndescription: Move to Pune\ngoal: be closer to family\n[/FIELDS]",
        "And what did you pick?",
        "Great.\n[FIELDS]\nfinal_choice: move next spring\n[/FIELDS]",
    ]);
    provider.set_extraction(
        r#"{"description": "Stay put", "constraints": ["rent", "school term"], "alternatives": ["stay", "move"], "reasoning": "family support"}"#,
    );
    let mut s = session(storage, provider.clone(), "pune@x.com");

    s.handle_input("I'm thinking of moving to Pune to be near family").unwrap();
    s.handle_input("Rent and the school term limit me; I could stay or move").unwrap();
    s.handle_input("I'll move next spring because of family support").unwrap();

    let draft = s.recorder().draft();
    assert_eq!(draft.description.as_deref(), Some("Move to Pune"), "reconciliation never overwrites");
    assert_eq!(draft.constraints, vec!["rent", "school term"]);
    assert_eq!(draft.reasoning.as_deref(), Some("family support"));
    assert!(s.recorder().is_complete());

    let extraction_calls = provider
        .requests()
        .iter()
        .filter(|r| r[0].content == neurolinker::recorder::prompts::EXTRACTION_SYSTEM_PROMPT)
        .count();
    assert!(extraction_calls >= 1);
}

#[test]
fn voice_input_uses_the_same_path() {
    let (_tmp, storage) = local_store();
    let mut s = session(storage, ScriptedProvider::offline(), "voice@x.com");

    let silent = s.handle_voice(&FixedTranscriber(None)).unwrap();
    assert!(matches!(silent.outcome, TurnOutcome::Ignored));

    let heard = s.handle_voice(&FixedTranscriber(Some("save".into()))).unwrap();
    assert!(matches!(heard.outcome, TurnOutcome::Incomplete { .. }));
}

#[test]
fn blank_input_is_ignored() {
    let (_tmp, storage) = local_store();
    let mut s = session(storage, ScriptedProvider::offline(), "blank@x.com");
    assert!(matches!(s.handle_input("   ").unwrap().outcome, TurnOutcome::Ignored));
}

#[test]
fn unverified_save_keeps_the_draft_for_a_retry() {
    let (_tmp, inner) = local_store();
    let storage: Arc<dyn StorageBackend> = Arc::new(ForgetfulStore(inner));
    let provider = ScriptedProvider::new([complete_reply()]);
    let mut s = session(storage, provider, "lost@x.com");

    s.handle_input("I want a bicycle").unwrap();
    let err = s.handle_input("save").unwrap_err();
    assert!(matches!(err, StorageError::NotPersisted(_)), "{err}");
    assert!(s.recorder().is_complete());
    assert_eq!(
        s.recorder().draft().final_choice.as_deref(),
        Some("a folding bicycle")
    );
}
