//! Process-local [`DocumentDatabase`].
//!
//! Behaves like the remote service for everything the journal relies on: merge
//! writes, server timestamps (taken from the local clock), equality filters,
//! ordering and limits. Ties in ordering fall back to insertion order.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use super::{compare_values, Direction, Document, DocumentDatabase, DocumentWrite, Fields, Query};
use crate::storage::StorageResult;

#[derive(Debug)]
struct StoredDocument {
    seq: u64,
    fields: Fields,
}

#[derive(Debug, Default)]
struct State {
    collections: HashMap<String, HashMap<String, StoredDocument>>,
    next_seq: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryDocuments {
    state: Mutex<State>,
}

impl InMemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of documents currently in `collection`.
    pub fn document_count(&self, collection: &str) -> usize {
        self.state()
            .collections
            .get(collection)
            .map(HashMap::len)
            .unwrap_or(0)
    }
}

fn server_now() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
}

impl DocumentDatabase for InMemoryDocuments {
    fn get(&self, collection: &str, key: &str) -> StorageResult<Option<Document>> {
        Ok(self
            .state()
            .collections
            .get(collection)
            .and_then(|docs| docs.get(key))
            .map(|doc| Document {
                key: key.to_string(),
                fields: doc.fields.clone(),
            }))
    }

    fn set(&self, collection: &str, key: &str, write: DocumentWrite) -> StorageResult<()> {
        let mut state = self.state();
        state.next_seq += 1;
        let seq = state.next_seq;

        let docs = state.collections.entry(collection.to_string()).or_default();
        let now = server_now();

        match docs.get_mut(key) {
            Some(existing) if write.merge => {
                existing.fields.extend(write.fields);
                for field in write.server_timestamps {
                    existing.fields.insert(field, now.clone());
                }
            }
            Some(existing) => {
                let mut fields = write.fields;
                for field in write.server_timestamps {
                    fields.insert(field, now.clone());
                }
                existing.fields = fields;
            }
            None => {
                let mut fields = write.fields;
                for field in write.server_timestamps {
                    fields.insert(field, now.clone());
                }
                docs.insert(key.to_string(), StoredDocument { seq, fields });
            }
        }
        Ok(())
    }

    fn delete(&self, collection: &str, key: &str) -> StorageResult<()> {
        if let Some(docs) = self.state().collections.get_mut(collection) {
            docs.remove(key);
        }
        Ok(())
    }

    fn query(&self, query: &Query) -> StorageResult<Vec<Document>> {
        let state = self.state();
        let Some(docs) = state.collections.get(&query.collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<(&String, &StoredDocument)> = docs
            .iter()
            .filter(|(_, doc)| {
                query
                    .filters
                    .iter()
                    .all(|(field, value)| doc.fields.get(field) == Some(value))
            })
            .filter(|(_, doc)| match &query.order_by {
                Some((field, _)) => doc.fields.contains_key(field),
                None => true,
            })
            .collect();

        match &query.order_by {
            Some((field, direction)) => matched.sort_by(|(_, a), (_, b)| {
                let ord = compare_values(&a.fields[field], &b.fields[field]).then(a.seq.cmp(&b.seq));
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            }),
            None => matched.sort_by_key(|(_, doc)| doc.seq),
        }

        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }

        Ok(matched
            .into_iter()
            .map(|(key, doc)| Document {
                key: key.clone(),
                fields: doc.fields.clone(),
            })
            .collect())
    }
}
