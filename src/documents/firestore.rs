//! Cloud Firestore over the REST v1 API.
//!
//! Writes go through `documents:commit` so that merge masks and
//! `REQUEST_TIME` server timestamps apply in a single request; reads are plain
//! `GET`s; queries use `:runQuery` with a structured query. Values are
//! translated between JSON and Firestore's typed value encoding; timestamps
//! come back as RFC 3339 strings.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{Direction, Document, DocumentDatabase, DocumentWrite, Fields, Query};
use crate::config::{expand_tilde, StorageConfig};
use crate::storage::{StorageError, StorageResult};

const FIRESTORE_API: &str = "https://firestore.googleapis.com/v1";

/// Environment variable naming a local Firestore emulator (`host:port`).
pub const EMULATOR_HOST_ENV: &str = "FIRESTORE_EMULATOR_HOST";

/// Document key used for the connectivity probe on connect.
const PROBE_KEY: &str = "__connectivity_probe__";

/// The subset of a service-account key file we need.
#[derive(Debug, Deserialize)]
struct ServiceAccount {
    project_id: Option<String>,
    #[serde(default)]
    client_email: Option<String>,
}

#[derive(Debug)]
pub struct FirestoreClient {
    http: Client,
    /// `projects/{project}/databases/(default)`
    database_path: String,
    /// `{api}/projects/{project}/databases/(default)/documents`
    documents_url: String,
    token: String,
}

impl FirestoreClient {
    /// Build a client from configuration and probe the service once.
    ///
    /// The project comes from `storage.project_id` or the service-account file;
    /// the bearer token from the environment variable named by
    /// `storage.access_token_env`. When `FIRESTORE_EMULATOR_HOST` is set the
    /// emulator is used and no token is needed.
    pub fn connect(config: &StorageConfig) -> StorageResult<Self> {
        let account = match config.credentials_path.as_deref() {
            Some(path) => {
                let path = expand_tilde(path);
                let raw = std::fs::read_to_string(&path).map_err(|source| StorageError::Io {
                    path: path.clone(),
                    source,
                })?;
                serde_json::from_str::<ServiceAccount>(&raw)
                    .map_err(|source| StorageError::Corrupt { path, source })?
            }
            None => ServiceAccount {
                project_id: None,
                client_email: None,
            },
        };

        let project = config
            .project_id
            .clone()
            .or(account.project_id)
            .ok_or_else(|| StorageError::Unavailable("no Firestore project id configured".into()))?;

        let (api_base, token) = match std::env::var(EMULATOR_HOST_ENV) {
            Ok(host) if !host.is_empty() => (format!("http://{host}/v1"), "owner".to_string()),
            _ => {
                let token = std::env::var(&config.access_token_env)
                    .ok()
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| {
                        StorageError::Unavailable(format!(
                            "{} is not set; cannot authenticate to Firestore",
                            config.access_token_env
                        ))
                    })?;
                (FIRESTORE_API.to_string(), token)
            }
        };

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let database_path = format!("projects/{project}/databases/(default)");
        let client = Self {
            http,
            documents_url: format!("{api_base}/{database_path}/documents"),
            database_path,
            token,
        };

        client.get("users", PROBE_KEY)?;
        tracing::info!(
            project = %project,
            account = account.client_email.as_deref().unwrap_or("-"),
            "connected to Firestore"
        );
        Ok(client)
    }

    fn document_name(&self, collection: &str, key: &str) -> String {
        format!("{}/documents/{collection}/{key}", self.database_path)
    }

    fn document_url(&self, collection: &str, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.documents_url,
            urlencoding::encode(collection),
            urlencoding::encode(key)
        )
    }

    /// Send a request whose 404 means the document does not exist.
    fn send_lookup(&self, request: RequestBuilder) -> StorageResult<Option<Value>> {
        self.send_with(request, true)
    }

    /// Send a request where any non-success status is an error.
    fn send(&self, request: RequestBuilder) -> StorageResult<Value> {
        Ok(self.send_with(request, false)?.unwrap_or(Value::Null))
    }

    fn send_with(&self, request: RequestBuilder, missing_ok: bool) -> StorageResult<Option<Value>> {
        let response = request.bearer_auth(&self.token).send()?;
        let status = response.status();
        if is_absent(status, missing_ok) {
            return Ok(None);
        }
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(StorageError::Remote {
                status: status.as_u16(),
                message,
            });
        }
        let body = response.text()?;
        if body.trim().is_empty() {
            return Ok(Some(Value::Null));
        }
        Ok(Some(serde_json::from_str(&body)?))
    }
}

/// Only lookups treat 404 as an absent document; a 404 on a write is a failure.
fn is_absent(status: StatusCode, missing_ok: bool) -> bool {
    missing_ok && status == StatusCode::NOT_FOUND
}

impl DocumentDatabase for FirestoreClient {
    fn get(&self, collection: &str, key: &str) -> StorageResult<Option<Document>> {
        let url = self.document_url(collection, key);
        match self.send_lookup(self.http.get(url))? {
            Some(body) => decode_document(&body).map(Some),
            None => Ok(None),
        }
    }

    fn set(&self, collection: &str, key: &str, write: DocumentWrite) -> StorageResult<()> {
        let body = commit_body(&self.document_name(collection, key), &write);
        let url = format!("{}:commit", self.documents_url);
        self.send(self.http.post(url).json(&body))?;
        tracing::trace!(collection, key, merge = write.merge, "firestore write committed");
        Ok(())
    }

    fn delete(&self, collection: &str, key: &str) -> StorageResult<()> {
        let url = self.document_url(collection, key);
        self.send(self.http.delete(url))?;
        Ok(())
    }

    fn query(&self, query: &Query) -> StorageResult<Vec<Document>> {
        let url = format!("{}:runQuery", self.documents_url);
        let body = json!({ "structuredQuery": structured_query(query) });
        let response = self.send(self.http.post(url).json(&body))?;

        let rows = response.as_array().cloned().unwrap_or_default();
        rows.iter()
            .filter_map(|row| row.get("document"))
            .map(decode_document)
            .collect()
    }
}

/// Build the `documents:commit` request body for one write.
pub(crate) fn commit_body(document_name: &str, write: &DocumentWrite) -> Value {
    let mut entry = json!({
        "update": {
            "name": document_name,
            "fields": encode_fields(&write.fields),
        }
    });

    if write.merge {
        let paths: Vec<&String> = write.fields.keys().collect();
        entry["updateMask"] = json!({ "fieldPaths": paths });
    }
    if !write.server_timestamps.is_empty() {
        let transforms: Vec<Value> = write
            .server_timestamps
            .iter()
            .map(|field| json!({ "fieldPath": field, "setToServerValue": "REQUEST_TIME" }))
            .collect();
        entry["updateTransforms"] = Value::Array(transforms);
    }

    json!({ "writes": [entry] })
}

/// Build a `StructuredQuery` for `:runQuery`.
pub(crate) fn structured_query(query: &Query) -> Value {
    let mut sq = json!({ "from": [{ "collectionId": query.collection }] });

    let filters: Vec<Value> = query
        .filters
        .iter()
        .map(|(field, value)| {
            json!({
                "fieldFilter": {
                    "field": { "fieldPath": field },
                    "op": "EQUAL",
                    "value": encode_value(value),
                }
            })
        })
        .collect();
    match filters.len() {
        0 => {}
        1 => sq["where"] = filters[0].clone(),
        _ => sq["where"] = json!({ "compositeFilter": { "op": "AND", "filters": filters } }),
    }

    if let Some((field, direction)) = &query.order_by {
        let direction = match direction {
            Direction::Ascending => "ASCENDING",
            Direction::Descending => "DESCENDING",
        };
        sq["orderBy"] = json!([{ "field": { "fieldPath": field }, "direction": direction }]);
    }
    if let Some(limit) = query.limit {
        sq["limit"] = json!(limit);
    }
    sq
}

pub(crate) fn encode_fields(fields: &Fields) -> Value {
    let encoded: serde_json::Map<String, Value> = fields
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect();
    Value::Object(encoded)
}

/// JSON value → Firestore typed value.
pub(crate) fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // int64 travels as a decimal string
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or(0.0) }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Firestore typed value → JSON value.
pub(crate) fn decode_value(value: &Value) -> StorageResult<Value> {
    let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return Err(malformed("typed value is not a single-key object"));
    };

    Ok(match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => Value::Bool(inner.as_bool().unwrap_or(false)),
        "integerValue" => {
            let n = match inner {
                Value::String(s) => s.parse::<i64>().map_err(|_| malformed("bad integerValue"))?,
                other => other.as_i64().ok_or_else(|| malformed("bad integerValue"))?,
            };
            Value::from(n)
        }
        "doubleValue" => Value::from(inner.as_f64().unwrap_or(0.0)),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "arrayValue" => {
            let items = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|vs| vs.iter().map(decode_value).collect::<StorageResult<Vec<_>>>())
                .transpose()?
                .unwrap_or_default();
            Value::Array(items)
        }
        "mapValue" => Value::Object(decode_fields(inner.get("fields"))?),
        other => return Err(malformed(&format!("unsupported value type {other}"))),
    })
}

fn decode_fields(fields: Option<&Value>) -> StorageResult<Fields> {
    let mut out = Fields::new();
    if let Some(map) = fields.and_then(Value::as_object) {
        for (k, v) in map {
            out.insert(k.clone(), decode_value(v)?);
        }
    }
    Ok(out)
}

/// Decode a REST `Document` resource; the key is the last segment of `name`.
pub(crate) fn decode_document(doc: &Value) -> StorageResult<Document> {
    let name = doc
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("document without name"))?;
    let key = name.rsplit('/').next().unwrap_or(name).to_string();
    Ok(Document {
        key,
        fields: decode_fields(doc.get("fields"))?,
    })
}

fn malformed(message: &str) -> StorageError {
    StorageError::Remote {
        status: 200,
        message: format!("malformed Firestore response: {message}"),
    }
}
