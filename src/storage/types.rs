//! Journal record types shared by every storage backend.
//!
//! Defines [`RecordId`] (integer or string identity), the stored records
//! ([`User`], [`Decision`], [`ChatMessage`], [`Preferences`]) and the typed
//! write payloads ([`DecisionInput`], [`ChatEntry`], [`PreferencesUpdate`]).

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Chat type used for messages exchanged while recording a decision.
pub const DECISION_RECORDING: &str = "decision_recording";

/// Default memory layer for new decisions.
pub const DEFAULT_MEMORY_LAYER: &str = "private";

/// Default outcome status for new decisions.
pub const DEFAULT_OUTCOME_STATUS: &str = "pending";

/// Backend-assigned identity of a user or chat message.
///
/// The local store hands out sequential integers, the remote store generated
/// string keys. Serialized untagged so both appear in their natural JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Seq(u64),
    Key(String),
}

impl RecordId {
    /// String form used as a document key.
    pub fn as_key(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Seq(n) => write!(f, "{n}"),
            Self::Key(k) => f.write_str(k),
        }
    }
}

impl std::str::FromStr for RecordId {
    type Err = std::convert::Infallible;

    /// All-digit input parses as a sequential id, anything else as a key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<u64>() {
            Ok(n) => Self::Seq(n),
            Err(_) => Self::Key(s.to_string()),
        })
    }
}

impl From<u64> for RecordId {
    fn from(n: u64) -> Self {
        Self::Seq(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self::Key(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self::Key(s)
    }
}

/// Which concrete store a backend handle talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// JSON array files on local disk.
    Local,
    /// Remote document database.
    Remote,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user as returned to callers. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: RecordId,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

/// A user as persisted, including the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredUser {
    pub id: RecordId,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl StoredUser {
    /// Detach the public view, dropping the hash.
    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            created_at: self.created_at,
        }
    }
}

/// A recorded decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    /// Owning user.
    pub user_id: RecordId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub goal: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub constraints: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub alternatives: Vec<String>,
    pub final_choice: Option<String>,
    pub reasoning: Option<String>,
    pub expected_outcome: Option<String>,
    /// Sharing scope tag, `"private"` unless stated otherwise.
    #[serde(default = "default_memory_layer", deserialize_with = "null_as_memory_layer")]
    pub memory_layer: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    pub reflection: Option<String>,
    /// Free-form; conventionally `"pending"` or `"completed"`.
    #[serde(default = "default_outcome_status", deserialize_with = "null_as_outcome_status")]
    pub outcome_status: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when saving a decision. Everything is optional; `id` selects
/// the record to overwrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionInput {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub goal: Option<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub alternatives: Vec<String>,
    pub final_choice: Option<String>,
    pub reasoning: Option<String>,
    pub expected_outcome: Option<String>,
    /// Defaults to [`DEFAULT_MEMORY_LAYER`].
    pub memory_layer: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub reflection: Option<String>,
    /// Defaults to [`DEFAULT_OUTCOME_STATUS`].
    pub outcome_status: Option<String>,
}

impl DecisionInput {
    /// Materialize the stored record for `owner` under `id`.
    pub(crate) fn to_decision(&self, id: &str, owner: &RecordId, created_at: DateTime<Utc>) -> Decision {
        Decision {
            id: id.to_string(),
            user_id: owner.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            goal: self.goal.clone(),
            constraints: self.constraints.clone(),
            alternatives: self.alternatives.clone(),
            final_choice: self.final_choice.clone(),
            reasoning: self.reasoning.clone(),
            expected_outcome: self.expected_outcome.clone(),
            memory_layer: self
                .memory_layer
                .clone()
                .unwrap_or_else(default_memory_layer),
            tags: self.tags.clone(),
            reflection: self.reflection.clone(),
            outcome_status: self
                .outcome_status
                .clone()
                .unwrap_or_else(default_outcome_status),
            created_at,
        }
    }
}

impl From<&Decision> for DecisionInput {
    /// Round-trip a stored decision into an overwrite payload (keeps the id).
    fn from(d: &Decision) -> Self {
        Self {
            id: Some(d.id.clone()),
            title: d.title.clone(),
            description: d.description.clone(),
            goal: d.goal.clone(),
            constraints: d.constraints.clone(),
            alternatives: d.alternatives.clone(),
            final_choice: d.final_choice.clone(),
            reasoning: d.reasoning.clone(),
            expected_outcome: d.expected_outcome.clone(),
            memory_layer: Some(d.memory_layer.clone()),
            tags: d.tags.clone(),
            reflection: d.reflection.clone(),
            outcome_status: Some(d.outcome_status.clone()),
        }
    }
}

/// One stored (user message, assistant reply) exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: RecordId,
    pub user_id: RecordId,
    pub decision_id: Option<String>,
    pub chat_type: String,
    pub user_message: String,
    pub ai_response: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_visible_to_user: bool,
}

/// A chat exchange to append.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    pub user_message: String,
    pub ai_response: String,
    pub chat_type: String,
    pub decision_id: Option<String>,
    pub visible: bool,
}

impl ChatEntry {
    /// A visible, unlinked `decision_recording` exchange.
    pub fn new(user_message: impl Into<String>, ai_response: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            ai_response: ai_response.into(),
            chat_type: DECISION_RECORDING.to_string(),
            decision_id: None,
            visible: true,
        }
    }

    pub fn chat_type(mut self, chat_type: impl Into<String>) -> Self {
        self.chat_type = chat_type.into();
        self
    }

    pub fn linked_to(mut self, decision_id: impl Into<String>) -> Self {
        self.decision_id = Some(decision_id.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// Criteria for [`StorageBackend::get_chat_history`](super::StorageBackend::get_chat_history).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatFilter {
    pub decision_id: Option<String>,
    pub chat_type: Option<String>,
    pub include_hidden: bool,
}

impl ChatFilter {
    /// Everything linked to one decision, hidden messages included.
    pub fn for_decision(decision_id: impl Into<String>) -> Self {
        Self {
            decision_id: Some(decision_id.into()),
            chat_type: None,
            include_hidden: true,
        }
    }

    pub(crate) fn matches(&self, msg: &ChatMessage) -> bool {
        if let Some(ref d) = self.decision_id {
            if msg.decision_id.as_deref() != Some(d.as_str()) {
                return false;
            }
        }
        if let Some(ref t) = self.chat_type {
            if &msg.chat_type != t {
                return false;
            }
        }
        self.include_hidden || msg.is_visible_to_user
    }
}

/// Per-user privacy preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub share_data_with_ai: bool,
    #[serde(default = "default_true")]
    pub view_chat_history: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            share_data_with_ai: false,
            view_chat_history: true,
        }
    }
}

/// Partial preferences update; `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferencesUpdate {
    pub share_data_with_ai: Option<bool>,
    pub view_chat_history: Option<bool>,
}

impl PreferencesUpdate {
    pub fn apply(&self, base: Preferences) -> Preferences {
        Preferences {
            share_data_with_ai: self.share_data_with_ai.unwrap_or(base.share_data_with_ai),
            view_chat_history: self.view_chat_history.unwrap_or(base.view_chat_history),
        }
    }
}

/// Preferences as persisted in the local store, keyed by owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PreferencesRecord {
    pub user_id: RecordId,
    #[serde(flatten)]
    pub preferences: Preferences,
}

fn default_true() -> bool {
    true
}

fn default_memory_layer() -> String {
    DEFAULT_MEMORY_LAYER.to_string()
}

fn default_outcome_status() -> String {
    DEFAULT_OUTCOME_STATUS.to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_memory_layer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_memory_layer))
}

fn null_as_outcome_status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_outcome_status))
}

/// Accept RFC 3339 timestamps and naive ISO 8601 ones (read as UTC), which
/// older journals wrote.
fn deserialize_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_id_serializes_untagged() {
        assert_eq!(serde_json::to_value(RecordId::Seq(3)).unwrap(), json!(3));
        assert_eq!(serde_json::to_value(RecordId::from("abc")).unwrap(), json!("abc"));

        let seq: RecordId = serde_json::from_value(json!(7)).unwrap();
        assert_eq!(seq, RecordId::Seq(7));
        // A digit string stays a key.
        let key: RecordId = serde_json::from_value(json!("7")).unwrap();
        assert_eq!(key, RecordId::Key("7".into()));
    }

    #[test]
    fn decision_reads_legacy_record_with_nulls_and_naive_timestamp() {
        let raw = json!({
            "id": "d1",
            "user_id": 1,
            "title": "Move",
            "description": "Move cities",
            "goal": null,
            "constraints": null,
            "alternatives": ["stay"],
            "final_choice": null,
            "reasoning": null,
            "expected_outcome": null,
            "memory_layer": null,
            "tags": [],
            "reflection": null,
            "outcome_status": null,
            "created_at": "2024-05-01T10:20:30.123456"
        });
        let d: Decision = serde_json::from_value(raw).unwrap();
        assert!(d.constraints.is_empty());
        assert_eq!(d.memory_layer, "private");
        assert_eq!(d.outcome_status, "pending");
        assert_eq!(d.created_at.to_rfc3339(), "2024-05-01T10:20:30.123456+00:00");
    }

    #[test]
    fn decision_input_applies_defaults() {
        let input = DecisionInput {
            description: Some("Move cities".into()),
            ..Default::default()
        };
        let d = input.to_decision("x", &RecordId::Seq(1), Utc::now());
        assert_eq!(d.memory_layer, DEFAULT_MEMORY_LAYER);
        assert_eq!(d.outcome_status, DEFAULT_OUTCOME_STATUS);
        assert_eq!(d.user_id, RecordId::Seq(1));
    }

    #[test]
    fn preferences_update_keeps_unspecified_fields() {
        let base = Preferences {
            share_data_with_ai: true,
            view_chat_history: false,
        };
        let update = PreferencesUpdate {
            view_chat_history: Some(true),
            ..Default::default()
        };
        let merged = update.apply(base);
        assert!(merged.share_data_with_ai);
        assert!(merged.view_chat_history);
    }

    #[test]
    fn chat_filter_matches_all_criteria() {
        let msg = ChatMessage {
            id: RecordId::Seq(1),
            user_id: RecordId::Seq(1),
            decision_id: Some("d1".into()),
            chat_type: DECISION_RECORDING.into(),
            user_message: "hi".into(),
            ai_response: "hello".into(),
            timestamp: Utc::now(),
            is_visible_to_user: false,
        };
        assert!(!ChatFilter::default().matches(&msg));
        assert!(ChatFilter::for_decision("d1").matches(&msg));
        assert!(!ChatFilter::for_decision("d2").matches(&msg));

        let by_type = ChatFilter {
            chat_type: Some("suggestion".into()),
            include_hidden: true,
            ..Default::default()
        };
        assert!(!by_type.matches(&msg));
    }
}
