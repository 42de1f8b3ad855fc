//! The journal over a [`DocumentDatabase`], as the Remote Document Store.
//!
//! Collections: `users`, `decisions`, `chat_history`, `user_preferences`.
//! Users and chat messages get generated document keys, decisions are keyed by
//! decision id, preferences by user id. Creation timestamps are assigned by the
//! database. Creating a user writes two documents without a transaction; a
//! missing preferences document reads back as defaults.

use serde_json::{json, Value};

use super::types::{
    BackendKind, ChatEntry, ChatFilter, ChatMessage, Decision, DecisionInput, Preferences,
    PreferencesUpdate, RecordId, StoredUser, User,
};
use super::{StorageBackend, StorageResult};
use crate::documents::{Direction, Document, DocumentDatabase, DocumentWrite, Fields, Query};
use crate::identity;

pub const USERS: &str = "users";
pub const DECISIONS: &str = "decisions";
pub const CHAT_HISTORY: &str = "chat_history";
pub const USER_PREFERENCES: &str = "user_preferences";

#[derive(Debug)]
pub struct RemoteDocumentStore<D> {
    db: D,
}

impl<D: DocumentDatabase> RemoteDocumentStore<D> {
    pub fn new(db: D) -> Self {
        Self { db }
    }

    /// The underlying document database.
    pub fn database(&self) -> &D {
        &self.db
    }

    fn find_user_by_email(&self, email: &str) -> StorageResult<Option<StoredUser>> {
        let query = Query::new(USERS).where_eq("email", email).limit(1);
        self.db
            .query(&query)?
            .into_iter()
            .next()
            .map(|doc| doc.into_record::<StoredUser>("id"))
            .transpose()
            .map_err(Into::into)
    }

    /// Fetch a decision document only if `owner` owns it.
    fn owned_decision(&self, owner: &RecordId, decision_id: &str) -> StorageResult<Option<Decision>> {
        let Some(doc) = self.db.get(DECISIONS, decision_id)? else {
            return Ok(None);
        };
        if doc.fields.get("user_id") != Some(&owner_value(owner)) {
            return Ok(None);
        }
        Ok(Some(doc.into_record("id")?))
    }
}

fn owner_value(owner: &RecordId) -> Value {
    // RecordId serializes untagged, so this matches what was stored.
    serde_json::to_value(owner).unwrap_or(Value::Null)
}

fn object(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}

/// Decision fields written on every save (everything except id and timestamp).
fn decision_fields(owner: &RecordId, input: &DecisionInput) -> Fields {
    let template = input.to_decision("", owner, chrono::Utc::now());
    let mut fields = object(serde_json::to_value(&template).unwrap_or(Value::Null));
    fields.remove("id");
    fields.remove("created_at");
    fields
}

fn decode_all<T: serde::de::DeserializeOwned>(docs: Vec<Document>) -> StorageResult<Vec<T>> {
    docs.into_iter()
        .map(|doc| doc.into_record("id").map_err(Into::into))
        .collect()
}

impl<D: DocumentDatabase> StorageBackend for RemoteDocumentStore<D> {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    fn create_user(&self, email: &str, password: &str, full_name: &str) -> StorageResult<bool> {
        if self.find_user_by_email(email)?.is_some() {
            tracing::debug!(email, "create_user rejected: email already registered");
            return Ok(false);
        }

        let key = identity::generate_document_key();
        let user = object(json!({
            "email": email,
            "password_hash": identity::hash_password(password),
            "full_name": full_name,
        }));
        self.db
            .set(USERS, &key, DocumentWrite::replace(user).with_server_timestamp("created_at"))?;

        let defaults = Preferences::default();
        let prefs = object(json!({
            "user_id": key,
            "share_data_with_ai": defaults.share_data_with_ai,
            "view_chat_history": defaults.view_chat_history,
        }));
        self.db.set(USER_PREFERENCES, &key, DocumentWrite::replace(prefs))?;

        tracing::info!(user_id = %key, "user created");
        Ok(true)
    }

    fn authenticate_user(&self, email: &str, password: &str) -> StorageResult<Option<RecordId>> {
        Ok(self
            .find_user_by_email(email)?
            .filter(|u| identity::verify_password(password, &u.password_hash))
            .map(|u| u.id))
    }

    fn get_user(&self, user_id: &RecordId) -> StorageResult<Option<User>> {
        let Some(doc) = self.db.get(USERS, &user_id.as_key())? else {
            return Ok(None);
        };
        let stored: StoredUser = doc.into_record("id")?;
        Ok(Some(stored.to_user()))
    }

    fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        Ok(self.find_user_by_email(email)?.map(|u| u.to_user()))
    }

    fn update_user_password(&self, user_id: &RecordId, new_password: &str) -> StorageResult<bool> {
        let key = user_id.as_key();
        if self.db.get(USERS, &key)?.is_none() {
            return Ok(false);
        }
        let update = object(json!({ "password_hash": identity::hash_password(new_password) }));
        self.db.set(USERS, &key, DocumentWrite::merge(update))?;
        Ok(true)
    }

    fn save_decision(&self, owner: &RecordId, input: &DecisionInput) -> StorageResult<String> {
        let mut id = input.id.clone().unwrap_or_else(identity::generate_id);
        let fields = decision_fields(owner, input);

        match self.db.get(DECISIONS, &id)? {
            Some(existing) if existing.fields.get("user_id") == Some(&owner_value(owner)) => {
                // Field-level merge; created_at and unrelated fields survive.
                self.db.set(DECISIONS, &id, DocumentWrite::merge(fields))?;
                tracing::debug!(decision_id = %id, "decision overwritten");
            }
            existing => {
                if existing.is_some() {
                    let fresh = identity::generate_id();
                    tracing::warn!(requested = %id, assigned = %fresh, "decision id owned by another user, assigning a new id");
                    id = fresh;
                }
                self.db.set(
                    DECISIONS,
                    &id,
                    DocumentWrite::replace(fields).with_server_timestamp("created_at"),
                )?;
                tracing::debug!(decision_id = %id, "decision inserted");
            }
        }
        Ok(id)
    }

    fn get_decision(&self, owner: &RecordId, decision_id: &str) -> StorageResult<Option<Decision>> {
        self.owned_decision(owner, decision_id)
    }

    fn get_user_decisions(&self, owner: &RecordId, limit: Option<usize>) -> StorageResult<Vec<Decision>> {
        if limit == Some(0) {
            return Ok(Vec::new());
        }
        let mut query = Query::new(DECISIONS)
            .where_eq("user_id", owner_value(owner))
            .order_by("created_at", Direction::Descending);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        decode_all(self.db.query(&query)?)
    }

    fn delete_decision(&self, owner: &RecordId, decision_id: &str) -> StorageResult<bool> {
        if self.owned_decision(owner, decision_id)?.is_none() {
            return Ok(false);
        }
        self.db.delete(DECISIONS, decision_id)?;
        tracing::info!(decision_id, "decision deleted");
        Ok(true)
    }

    fn save_chat_message(&self, owner: &RecordId, entry: &ChatEntry) -> StorageResult<RecordId> {
        let key = identity::generate_document_key();
        let fields = object(json!({
            "user_id": owner_value(owner),
            "decision_id": entry.decision_id,
            "chat_type": entry.chat_type,
            "user_message": entry.user_message,
            "ai_response": entry.ai_response,
            "is_visible_to_user": entry.visible,
        }));
        self.db.set(
            CHAT_HISTORY,
            &key,
            DocumentWrite::replace(fields).with_server_timestamp("timestamp"),
        )?;
        Ok(RecordId::Key(key))
    }

    fn get_chat_history(&self, owner: &RecordId, filter: &ChatFilter) -> StorageResult<Vec<ChatMessage>> {
        let mut query = Query::new(CHAT_HISTORY).where_eq("user_id", owner_value(owner));
        if let Some(ref decision_id) = filter.decision_id {
            query = query.where_eq("decision_id", decision_id.as_str());
        }
        if let Some(ref chat_type) = filter.chat_type {
            query = query.where_eq("chat_type", chat_type.as_str());
        }
        if !filter.include_hidden {
            query = query.where_eq("is_visible_to_user", true);
        }
        query = query.order_by("timestamp", Direction::Ascending);
        decode_all(self.db.query(&query)?)
    }

    fn get_user_preferences(&self, owner: &RecordId) -> StorageResult<Preferences> {
        let Some(doc) = self.db.get(USER_PREFERENCES, &owner.as_key())? else {
            return Ok(Preferences::default());
        };
        Ok(serde_json::from_value(Value::Object(doc.fields))?)
    }

    fn update_user_preferences(&self, owner: &RecordId, update: &PreferencesUpdate) -> StorageResult<bool> {
        let merged = update.apply(self.get_user_preferences(owner)?);
        let fields = object(json!({
            "user_id": owner_value(owner),
            "share_data_with_ai": merged.share_data_with_ai,
            "view_chat_history": merged.view_chat_history,
        }));
        self.db
            .set(USER_PREFERENCES, &owner.as_key(), DocumentWrite::merge(fields))?;
        Ok(true)
    }
}
