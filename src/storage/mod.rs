//! Persistence for users, decisions, chat history and preferences.
//!
//! [`StorageBackend`] is the contract every store satisfies identically:
//! [`local::LocalFileStore`] keeps JSON array files on disk,
//! [`remote::RemoteDocumentStore`] talks to a document database. The handle to
//! use is chosen once at startup by [`selector::select_backend`] and passed to
//! every component that persists anything.

pub mod local;
pub mod remote;
pub mod selector;
pub mod types;

use std::path::PathBuf;

use types::{
    BackendKind, ChatEntry, ChatFilter, ChatMessage, Decision, DecisionInput, Preferences,
    PreferencesUpdate, RecordId, User,
};

/// Failure at the storage boundary (disk, network, or unreadable data).
///
/// Not-found and duplicate-email outcomes are ordinary `Ok` values, never errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("remote store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote store returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    #[error("decision {0} did not read back after saving")]
    NotPersisted(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// The journal's persistence contract.
///
/// Every read, update and delete of a decision is filtered by owner as well as
/// id, so a caller can never observe another user's records. Returned values are
/// detached copies.
pub trait StorageBackend: Send + Sync {
    /// Which concrete store this is.
    fn kind(&self) -> BackendKind;

    /// Create a user with a default preferences record.
    ///
    /// Returns `false` if the email (exact, case-sensitive) is already taken.
    fn create_user(&self, email: &str, password: &str, full_name: &str) -> StorageResult<bool>;

    /// Return the user's id if the password hashes to the stored hash.
    fn authenticate_user(&self, email: &str, password: &str) -> StorageResult<Option<RecordId>>;

    fn get_user(&self, user_id: &RecordId) -> StorageResult<Option<User>>;

    fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>>;

    /// Returns `false` if the user does not exist.
    fn update_user_password(&self, user_id: &RecordId, new_password: &str) -> StorageResult<bool>;

    /// Insert or overwrite a decision, returning its id.
    ///
    /// A missing `input.id` gets a generated one. An id that already belongs to
    /// `owner` is overwritten in place, keeping its original `created_at`.
    fn save_decision(&self, owner: &RecordId, input: &DecisionInput) -> StorageResult<String>;

    /// `None` if the decision does not exist or belongs to another user.
    fn get_decision(&self, owner: &RecordId, decision_id: &str) -> StorageResult<Option<Decision>>;

    /// The owner's decisions, newest first, capped at `limit` when given.
    fn get_user_decisions(&self, owner: &RecordId, limit: Option<usize>) -> StorageResult<Vec<Decision>>;

    /// Returns `false` if no decision with that id belonged to `owner`.
    fn delete_decision(&self, owner: &RecordId, decision_id: &str) -> StorageResult<bool>;

    /// Append one exchange to the owner's chat history.
    fn save_chat_message(&self, owner: &RecordId, entry: &ChatEntry) -> StorageResult<RecordId>;

    /// The owner's chat history in chronological order, narrowed by `filter`.
    fn get_chat_history(&self, owner: &RecordId, filter: &ChatFilter) -> StorageResult<Vec<ChatMessage>>;

    /// Full audit trail of one decision, hidden messages included.
    fn get_chat_history_for_decision(
        &self,
        owner: &RecordId,
        decision_id: &str,
    ) -> StorageResult<Vec<ChatMessage>> {
        self.get_chat_history(owner, &ChatFilter::for_decision(decision_id))
    }

    /// Stored preferences, or defaults if none exist.
    fn get_user_preferences(&self, owner: &RecordId) -> StorageResult<Preferences>;

    /// Upsert preferences; unspecified fields keep their value.
    fn update_user_preferences(&self, owner: &RecordId, update: &PreferencesUpdate) -> StorageResult<bool>;
}
