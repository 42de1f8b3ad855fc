#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use neurolinker::assistant::{AssistantError, ChatTurn, CompletionProvider, Transcriber};
use neurolinker::documents::memory::InMemoryDocuments;
use neurolinker::recorder::prompts::EXTRACTION_SYSTEM_PROMPT;
use neurolinker::storage::local::LocalFileStore;
use neurolinker::storage::remote::RemoteDocumentStore;
use neurolinker::storage::types::{
    BackendKind, ChatEntry, ChatFilter, ChatMessage, Decision, DecisionInput, Preferences,
    PreferencesUpdate, RecordId, User,
};
use neurolinker::storage::{StorageBackend, StorageResult};
use tempfile::TempDir;

/// A local store in a fresh temp directory. Keep the `TempDir` alive for the
/// duration of the test.
pub fn local_store() -> (TempDir, Arc<dyn StorageBackend>) {
    let tmp = TempDir::new().unwrap();
    let store = LocalFileStore::open(tmp.path().join("data")).unwrap();
    (tmp, Arc::new(store))
}

/// A remote store over a process-local document database.
pub fn remote_store() -> Arc<dyn StorageBackend> {
    Arc::new(RemoteDocumentStore::new(InMemoryDocuments::new()))
}

/// Run `check` against both backends, labelled for assertion messages.
pub fn for_each_backend(check: impl Fn(&str, &dyn StorageBackend)) {
    let (_tmp, local) = local_store();
    check("local", local.as_ref());
    let remote = remote_store();
    check("remote", remote.as_ref());
}

/// Create an account and return its id.
pub fn signup(storage: &dyn StorageBackend, email: &str) -> RecordId {
    assert!(storage.create_user(email, "secret", "Test User").unwrap());
    storage.authenticate_user(email, "secret").unwrap().unwrap()
}

/// Completion provider that plays back scripted replies in order.
///
/// Extraction requests (full-transcript reconciliation) are answered from a
/// separate reply so they do not consume the conversational script. Once the
/// script runs out every call fails as if the service were down.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
    extraction: Mutex<String>,
    requests: Mutex<Vec<Vec<ChatTurn>>>,
}

impl ScriptedProvider {
    pub fn new<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            extraction: Mutex::new("{}".to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// A provider whose every call fails.
    pub fn offline() -> Arc<Self> {
        Self::new(Vec::<String>::new())
    }

    pub fn set_extraction(&self, json: &str) {
        *self.extraction.lock().unwrap() = json.to_string();
    }

    pub fn requests(&self) -> Vec<Vec<ChatTurn>> {
        self.requests.lock().unwrap().clone()
    }
}

impl CompletionProvider for ScriptedProvider {
    fn complete(&self, turns: &[ChatTurn]) -> Result<String, AssistantError> {
        self.requests.lock().unwrap().push(turns.to_vec());
        if turns.first().is_some_and(|t| t.content == EXTRACTION_SYSTEM_PROMPT) {
            return Ok(self.extraction.lock().unwrap().clone());
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AssistantError::ServiceUnavailable("script exhausted".into()))
    }
}

/// Transcriber that hears a fixed phrase (or nothing).
pub struct FixedTranscriber(pub Option<String>);

impl Transcriber for FixedTranscriber {
    fn transcribe(&self) -> Result<Option<String>, AssistantError> {
        Ok(self.0.clone())
    }
}

/// A reply whose field block fills every required field.
pub fn complete_reply() -> String {
    "Thanks, that covers everything. Type 'save' when ready.\n\
     [FIELDS]\n\
     description: Buy a bicycle for commuting\n\
     goal: Get to work without the bus\n\
     constraints: budget under 500; storage in a small flat\n\
     alternatives: keep taking the bus; buy an e-scooter\n\
     final_choice: a folding bicycle\n\
     reasoning: cheap, healthy and fits in the flat\n\
     [/FIELDS]"
        .to_string()
}

/// Store wrapper whose decisions never read back after saving.
pub struct ForgetfulStore(pub Arc<dyn StorageBackend>);

impl StorageBackend for ForgetfulStore {
    fn kind(&self) -> BackendKind {
        self.0.kind()
    }
    fn create_user(&self, email: &str, password: &str, full_name: &str) -> StorageResult<bool> {
        self.0.create_user(email, password, full_name)
    }
    fn authenticate_user(&self, email: &str, password: &str) -> StorageResult<Option<RecordId>> {
        self.0.authenticate_user(email, password)
    }
    fn get_user(&self, user_id: &RecordId) -> StorageResult<Option<User>> {
        self.0.get_user(user_id)
    }
    fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        self.0.get_user_by_email(email)
    }
    fn update_user_password(&self, user_id: &RecordId, new_password: &str) -> StorageResult<bool> {
        self.0.update_user_password(user_id, new_password)
    }
    fn save_decision(&self, owner: &RecordId, input: &DecisionInput) -> StorageResult<String> {
        self.0.save_decision(owner, input)
    }
    fn get_decision(&self, _owner: &RecordId, _decision_id: &str) -> StorageResult<Option<Decision>> {
        Ok(None)
    }
    fn get_user_decisions(&self, owner: &RecordId, limit: Option<usize>) -> StorageResult<Vec<Decision>> {
        self.0.get_user_decisions(owner, limit)
    }
    fn delete_decision(&self, owner: &RecordId, decision_id: &str) -> StorageResult<bool> {
        self.0.delete_decision(owner, decision_id)
    }
    fn save_chat_message(&self, owner: &RecordId, entry: &ChatEntry) -> StorageResult<RecordId> {
        self.0.save_chat_message(owner, entry)
    }
    fn get_chat_history(&self, owner: &RecordId, filter: &ChatFilter) -> StorageResult<Vec<ChatMessage>> {
        self.0.get_chat_history(owner, filter)
    }
    fn get_user_preferences(&self, owner: &RecordId) -> StorageResult<Preferences> {
        self.0.get_user_preferences(owner)
    }
    fn update_user_preferences(&self, owner: &RecordId, update: &PreferencesUpdate) -> StorageResult<bool> {
        self.0.update_user_preferences(owner, update)
    }
}
