//! Local File Store: one pretty-printed JSON array file per collection.
//!
//! Every operation loads the whole array, does a linear pass, and rewrites the
//! whole array through a temp file + rename. A mutex serialises the
//! read-modify-write cycles of one store instance; two processes sharing a data
//! directory can still lose updates.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::{
    BackendKind, ChatEntry, ChatFilter, ChatMessage, Decision, DecisionInput, Preferences,
    PreferencesRecord, PreferencesUpdate, RecordId, StoredUser, User,
};
use super::{StorageBackend, StorageError, StorageResult};
use crate::identity;

/// The four collections and their file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Users,
    Decisions,
    Chat,
    Preferences,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Users,
        Collection::Decisions,
        Collection::Chat,
        Collection::Preferences,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Users => "users.json",
            Self::Decisions => "decisions.json",
            Self::Chat => "chat.json",
            Self::Preferences => "preferences.json",
        }
    }
}

#[derive(Debug)]
pub struct LocalFileStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl LocalFileStore {
    /// Open (or create) a store in `dir`, creating empty collection files.
    pub fn open(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            path: dir.clone(),
            source,
        })?;

        let store = Self {
            dir,
            lock: Mutex::new(()),
        };
        for collection in Collection::ALL {
            let path = store.collection_path(collection);
            if !path.exists() {
                store.write_array::<serde_json::Value>(collection, &[])?;
            }
        }

        tracing::info!(dir = %store.dir.display(), "local file store ready");
        Ok(store)
    }

    pub fn data_dir(&self) -> &Path {
        &self.dir
    }

    pub fn collection_path(&self, collection: Collection) -> PathBuf {
        self.dir.join(collection.file_name())
    }

    /// Serialise read-modify-write cycles. A poisoned lock only means another
    /// call panicked mid-operation; the files themselves are still consistent.
    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read_array<T: DeserializeOwned>(&self, collection: Collection) -> StorageResult<Vec<T>> {
        let path = self.collection_path(collection);
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        serde_json::from_str(&contents).map_err(|source| StorageError::Corrupt { path, source })
    }

    fn write_array<T: Serialize>(&self, collection: Collection, records: &[T]) -> StorageResult<()> {
        let path = self.collection_path(collection);
        let json = serde_json::to_string_pretty(records)?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(|source| StorageError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &path).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::trace!(file = collection.file_name(), records = records.len(), "collection rewritten");
        Ok(())
    }
}

/// Next sequential id: one past the largest integer id in use.
///
/// Using the maximum rather than the record count keeps ids unique even if
/// records are removed from the file.
fn next_seq<'a>(ids: impl Iterator<Item = &'a RecordId>) -> RecordId {
    let max = ids
        .filter_map(|id| match id {
            RecordId::Seq(n) => Some(*n),
            RecordId::Key(_) => None,
        })
        .max()
        .unwrap_or(0);
    RecordId::Seq(max + 1)
}

impl StorageBackend for LocalFileStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn create_user(&self, email: &str, password: &str, full_name: &str) -> StorageResult<bool> {
        let _guard = self.guard();

        let mut users: Vec<StoredUser> = self.read_array(Collection::Users)?;
        if users.iter().any(|u| u.email == email) {
            tracing::debug!(email, "create_user rejected: email already registered");
            return Ok(false);
        }

        let id = next_seq(users.iter().map(|u| &u.id));
        users.push(StoredUser {
            id: id.clone(),
            email: email.to_string(),
            password_hash: identity::hash_password(password),
            full_name: full_name.to_string(),
            created_at: Utc::now(),
        });
        self.write_array(Collection::Users, &users)?;

        let mut prefs: Vec<PreferencesRecord> = self.read_array(Collection::Preferences)?;
        if !prefs.iter().any(|p| p.user_id == id) {
            prefs.push(PreferencesRecord {
                user_id: id.clone(),
                preferences: Preferences::default(),
            });
            self.write_array(Collection::Preferences, &prefs)?;
        }

        tracing::info!(user_id = %id, "user created");
        Ok(true)
    }

    fn authenticate_user(&self, email: &str, password: &str) -> StorageResult<Option<RecordId>> {
        let users: Vec<StoredUser> = self.read_array(Collection::Users)?;
        Ok(users
            .into_iter()
            .find(|u| u.email == email && identity::verify_password(password, &u.password_hash))
            .map(|u| u.id))
    }

    fn get_user(&self, user_id: &RecordId) -> StorageResult<Option<User>> {
        let users: Vec<StoredUser> = self.read_array(Collection::Users)?;
        Ok(users.iter().find(|u| &u.id == user_id).map(StoredUser::to_user))
    }

    fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let users: Vec<StoredUser> = self.read_array(Collection::Users)?;
        Ok(users.iter().find(|u| u.email == email).map(StoredUser::to_user))
    }

    fn update_user_password(&self, user_id: &RecordId, new_password: &str) -> StorageResult<bool> {
        let _guard = self.guard();

        let mut users: Vec<StoredUser> = self.read_array(Collection::Users)?;
        let Some(user) = users.iter_mut().find(|u| &u.id == user_id) else {
            return Ok(false);
        };
        user.password_hash = identity::hash_password(new_password);
        self.write_array(Collection::Users, &users)?;
        Ok(true)
    }

    fn save_decision(&self, owner: &RecordId, input: &DecisionInput) -> StorageResult<String> {
        let _guard = self.guard();

        let mut decisions: Vec<Decision> = self.read_array(Collection::Decisions)?;
        let mut id = input.id.clone().unwrap_or_else(identity::generate_id);

        match decisions
            .iter()
            .position(|d| d.id == id && &d.user_id == owner)
        {
            Some(pos) => {
                let created_at = decisions[pos].created_at;
                decisions[pos] = input.to_decision(&id, owner, created_at);
                tracing::debug!(decision_id = %id, "decision overwritten");
            }
            None => {
                if decisions.iter().any(|d| d.id == id) {
                    // Never touch a record owned by someone else.
                    let fresh = identity::generate_id();
                    tracing::warn!(requested = %id, assigned = %fresh, "decision id owned by another user, assigning a new id");
                    id = fresh;
                }
                decisions.insert(0, input.to_decision(&id, owner, Utc::now()));
                tracing::debug!(decision_id = %id, "decision inserted");
            }
        }

        self.write_array(Collection::Decisions, &decisions)?;
        Ok(id)
    }

    fn get_decision(&self, owner: &RecordId, decision_id: &str) -> StorageResult<Option<Decision>> {
        let decisions: Vec<Decision> = self.read_array(Collection::Decisions)?;
        Ok(decisions
            .into_iter()
            .find(|d| d.id == decision_id && &d.user_id == owner))
    }

    fn get_user_decisions(&self, owner: &RecordId, limit: Option<usize>) -> StorageResult<Vec<Decision>> {
        let mut decisions: Vec<Decision> = self
            .read_array::<Decision>(Collection::Decisions)?
            .into_iter()
            .filter(|d| &d.user_id == owner)
            .collect();
        decisions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            decisions.truncate(limit);
        }
        Ok(decisions)
    }

    fn delete_decision(&self, owner: &RecordId, decision_id: &str) -> StorageResult<bool> {
        let _guard = self.guard();

        let mut decisions: Vec<Decision> = self.read_array(Collection::Decisions)?;
        let before = decisions.len();
        decisions.retain(|d| !(d.id == decision_id && &d.user_id == owner));
        if decisions.len() == before {
            return Ok(false);
        }
        self.write_array(Collection::Decisions, &decisions)?;
        tracing::info!(decision_id, "decision deleted");
        Ok(true)
    }

    fn save_chat_message(&self, owner: &RecordId, entry: &ChatEntry) -> StorageResult<RecordId> {
        let _guard = self.guard();

        let mut chat: Vec<ChatMessage> = self.read_array(Collection::Chat)?;
        let id = next_seq(chat.iter().map(|c| &c.id));
        chat.push(ChatMessage {
            id: id.clone(),
            user_id: owner.clone(),
            decision_id: entry.decision_id.clone(),
            chat_type: entry.chat_type.clone(),
            user_message: entry.user_message.clone(),
            ai_response: entry.ai_response.clone(),
            timestamp: Utc::now(),
            is_visible_to_user: entry.visible,
        });
        self.write_array(Collection::Chat, &chat)?;
        Ok(id)
    }

    fn get_chat_history(&self, owner: &RecordId, filter: &ChatFilter) -> StorageResult<Vec<ChatMessage>> {
        let mut chat: Vec<ChatMessage> = self
            .read_array::<ChatMessage>(Collection::Chat)?
            .into_iter()
            .filter(|c| &c.user_id == owner && filter.matches(c))
            .collect();
        chat.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(chat)
    }

    fn get_user_preferences(&self, owner: &RecordId) -> StorageResult<Preferences> {
        let prefs: Vec<PreferencesRecord> = self.read_array(Collection::Preferences)?;
        Ok(prefs
            .into_iter()
            .find(|p| &p.user_id == owner)
            .map(|p| p.preferences)
            .unwrap_or_default())
    }

    fn update_user_preferences(&self, owner: &RecordId, update: &PreferencesUpdate) -> StorageResult<bool> {
        let _guard = self.guard();

        let mut prefs: Vec<PreferencesRecord> = self.read_array(Collection::Preferences)?;
        match prefs.iter_mut().find(|p| &p.user_id == owner) {
            Some(record) => record.preferences = update.apply(record.preferences),
            None => prefs.push(PreferencesRecord {
                user_id: owner.clone(),
                preferences: update.apply(Preferences::default()),
            }),
        }
        self.write_array(Collection::Preferences, &prefs)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, LocalFileStore) {
        let tmp = TempDir::new().unwrap();
        let store = LocalFileStore::open(tmp.path().join("data")).unwrap();
        (tmp, store)
    }

    #[test]
    fn open_creates_four_empty_collections() {
        let (_tmp, store) = test_store();
        for collection in Collection::ALL {
            let contents = fs::read_to_string(store.collection_path(collection)).unwrap();
            assert_eq!(contents.trim(), "[]");
        }
    }

    #[test]
    fn next_seq_uses_max_id() {
        let ids = [RecordId::Seq(1), RecordId::Seq(5), RecordId::from("k")];
        assert_eq!(next_seq(ids.iter()), RecordId::Seq(6));
        assert_eq!(next_seq(std::iter::empty()), RecordId::Seq(1));
    }

    #[test]
    fn user_ids_are_sequential_integers() {
        let (_tmp, store) = test_store();
        assert!(store.create_user("a@x.com", "pw", "A").unwrap());
        assert!(store.create_user("b@x.com", "pw", "B").unwrap());

        let b = store.get_user_by_email("b@x.com").unwrap().unwrap();
        assert_eq!(b.id, RecordId::Seq(2));
    }

    #[test]
    fn files_are_pretty_printed_and_hash_is_stored() {
        let (_tmp, store) = test_store();
        store.create_user("a@x.com", "pw1", "A").unwrap();

        let raw = fs::read_to_string(store.collection_path(Collection::Users)).unwrap();
        assert!(raw.contains("\n  {"));
        assert!(raw.contains(&identity::hash_password("pw1")));
        assert!(!raw.contains("\"pw1\""));
    }

    #[test]
    fn overwrite_keeps_list_position() {
        let (_tmp, store) = test_store();
        let owner = RecordId::Seq(1);
        let first = store
            .save_decision(&owner, &DecisionInput { title: Some("first".into()), ..Default::default() })
            .unwrap();
        store
            .save_decision(&owner, &DecisionInput { title: Some("second".into()), ..Default::default() })
            .unwrap();

        store
            .save_decision(
                &owner,
                &DecisionInput {
                    id: Some(first.clone()),
                    title: Some("first, revised".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        let raw: Vec<Decision> = store.read_array(Collection::Decisions).unwrap();
        assert_eq!(raw.len(), 2);
        // Newest insert sits at the front; the overwritten record stays second.
        assert_eq!(raw[1].id, first);
        assert_eq!(raw[1].title.as_deref(), Some("first, revised"));
    }

    #[test]
    fn corrupt_file_is_a_distinct_error() {
        let (_tmp, store) = test_store();
        fs::write(store.collection_path(Collection::Users), "{not json").unwrap();

        let err = store.get_user_by_email("a@x.com").unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[test]
    fn foreign_decision_id_is_not_overwritten() {
        let (_tmp, store) = test_store();
        let a = RecordId::Seq(1);
        let b = RecordId::Seq(2);

        let id = store
            .save_decision(&a, &DecisionInput { title: Some("A's".into()), ..Default::default() })
            .unwrap();
        let b_id = store
            .save_decision(
                &b,
                &DecisionInput {
                    id: Some(id.clone()),
                    title: Some("B's".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_ne!(b_id, id);
        let still_a = store.get_decision(&a, &id).unwrap().unwrap();
        assert_eq!(still_a.title.as_deref(), Some("A's"));
        assert!(store.get_decision(&b, &b_id).unwrap().is_some());
    }
}
