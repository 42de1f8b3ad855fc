//! Document-database abstraction behind the remote store.
//!
//! A [`DocumentDatabase`] stores JSON-object documents under string keys in
//! named collections and answers equality-filtered, ordered queries. Two
//! implementations exist: [`memory::InMemoryDocuments`] (process-local) and,
//! with the `remote` feature, [`firestore::FirestoreClient`] (Cloud Firestore
//! over its REST API).

#[cfg(feature = "remote")]
pub mod firestore;
pub mod memory;

use std::cmp::Ordering;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::storage::types::parse_timestamp;
use crate::storage::StorageResult;

/// Field map of one document.
pub type Fields = serde_json::Map<String, Value>;

/// A fetched document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub key: String,
    pub fields: Fields,
}

impl Document {
    /// Deserialize into a record, injecting the document key as `id_field`.
    pub fn into_record<T: DeserializeOwned>(mut self, id_field: &str) -> Result<T, serde_json::Error> {
        self.fields.insert(id_field.to_string(), Value::String(self.key));
        serde_json::from_value(Value::Object(self.fields))
    }
}

/// A write to one document.
///
/// With `merge = false` the document is replaced; with `merge = true` only the
/// listed fields change and everything else on the document is preserved.
/// Fields named in `server_timestamps` are set to the store's clock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentWrite {
    pub fields: Fields,
    pub merge: bool,
    pub server_timestamps: Vec<String>,
}

impl DocumentWrite {
    pub fn replace(fields: Fields) -> Self {
        Self {
            fields,
            merge: false,
            server_timestamps: Vec::new(),
        }
    }

    pub fn merge(fields: Fields) -> Self {
        Self {
            fields,
            merge: true,
            server_timestamps: Vec::new(),
        }
    }

    pub fn with_server_timestamp(mut self, field: &str) -> Self {
        self.server_timestamps.push(field.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Equality-filtered query over one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push((field.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Per-document storage operations. Each call is individually atomic; nothing
/// spans documents.
pub trait DocumentDatabase: Send + Sync {
    fn get(&self, collection: &str, key: &str) -> StorageResult<Option<Document>>;

    /// Create or update a document (see [`DocumentWrite`]).
    fn set(&self, collection: &str, key: &str, write: DocumentWrite) -> StorageResult<()>;

    /// Deleting a missing document is not an error.
    fn delete(&self, collection: &str, key: &str) -> StorageResult<()>;

    /// Documents lacking the `order_by` field are excluded, as in Firestore.
    fn query(&self, query: &Query) -> StorageResult<Vec<Document>>;
}

impl<D: DocumentDatabase + ?Sized> DocumentDatabase for Arc<D> {
    fn get(&self, collection: &str, key: &str) -> StorageResult<Option<Document>> {
        (**self).get(collection, key)
    }

    fn set(&self, collection: &str, key: &str, write: DocumentWrite) -> StorageResult<()> {
        (**self).set(collection, key, write)
    }

    fn delete(&self, collection: &str, key: &str) -> StorageResult<()> {
        (**self).delete(collection, key)
    }

    fn query(&self, query: &Query) -> StorageResult<Vec<Document>> {
        (**self).query(query)
    }
}

/// Total order over field values used for sorting: null < bool < number <
/// timestamp < string < everything else. Strings that parse as timestamps
/// compare chronologically.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(s) if parse_timestamp(s).is_some() => 3,
            Value::String(_) => 4,
            Value::Array(_) => 5,
            Value::Object(_) => 6,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => match (parse_timestamp(x), parse_timestamp(y)) {
            (Some(tx), Some(ty)) => tx.cmp(&ty),
            (None, None) => x.cmp(y),
            _ => rank(a).cmp(&rank(b)),
        },
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn timestamps_compare_chronologically_across_formats() {
        let a = json!("2024-05-01T10:00:00Z");
        let b = json!("2024-05-01T10:00:00.5+00:00");
        assert_eq!(compare_values(&a, &b), Ordering::Less);
    }

    #[test]
    fn mixed_types_follow_rank() {
        assert_eq!(compare_values(&Value::Null, &json!(false)), Ordering::Less);
        assert_eq!(compare_values(&json!(10), &json!("abc")), Ordering::Less);
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
    }

    #[test]
    fn into_record_injects_key() {
        #[derive(serde::Deserialize)]
        struct Rec {
            id: String,
            name: String,
        }

        let mut fields = Fields::new();
        fields.insert("name".into(), json!("n"));
        let rec: Rec = Document { key: "k1".into(), fields }.into_record("id").unwrap();
        assert_eq!(rec.id, "k1");
        assert_eq!(rec.name, "n");
    }
}
