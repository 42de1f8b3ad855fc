//! Startup-time backend selection.
//!
//! Runs once per process and yields the single storage handle every component
//! receives:
//!
//! 1. `force_local` → Local File Store.
//! 2. Credentials configured, present on disk, and the crate built with the
//!    `remote` feature → Remote Document Store over Firestore. Any failure here
//!    is logged and falls through.
//! 3. Otherwise → Local File Store.

use std::path::Path;
use std::sync::Arc;

use super::local::LocalFileStore;
use super::{StorageBackend, StorageResult};
use crate::config::{expand_tilde, StorageConfig};

/// Choose and construct the storage backend.
///
/// Only a failure to open the local store is an error; remote problems
/// downgrade to the local store with a warning.
pub fn select_backend(config: &StorageConfig) -> StorageResult<Arc<dyn StorageBackend>> {
    let data_dir = expand_tilde(&config.data_dir);
    if config.force_local {
        tracing::info!("local store forced by configuration");
        return open_local(&data_dir);
    }

    match config.credentials_path.as_deref() {
        Some(path) if expand_tilde(path).exists() => {
            if let Some(remote) = try_remote(config) {
                return Ok(remote);
            }
        }
        Some(path) => {
            tracing::warn!(credentials = %path, "remote credentials file not found, using local store");
        }
        None => tracing::debug!("no remote credentials configured"),
    }

    open_local(&data_dir)
}

fn open_local(data_dir: &Path) -> StorageResult<Arc<dyn StorageBackend>> {
    Ok(Arc::new(LocalFileStore::open(data_dir)?))
}

#[cfg(feature = "remote")]
fn try_remote(config: &StorageConfig) -> Option<Arc<dyn StorageBackend>> {
    use super::remote::RemoteDocumentStore;
    use crate::documents::firestore::FirestoreClient;

    match FirestoreClient::connect(config) {
        Ok(client) => {
            tracing::info!("using remote document store");
            Some(Arc::new(RemoteDocumentStore::new(client)))
        }
        Err(e) => {
            tracing::warn!(error = %e, "remote store unavailable, falling back to local store");
            None
        }
    }
}

#[cfg(not(feature = "remote"))]
fn try_remote(_config: &StorageConfig) -> Option<Arc<dyn StorageBackend>> {
    tracing::warn!("remote credentials configured but built without the `remote` feature, using local store");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::BackendKind;
    use tempfile::TempDir;

    fn data_dir(tmp: &TempDir) -> String {
        tmp.path().join("data").to_string_lossy().into_owned()
    }

    #[test]
    fn force_local_wins_over_credentials() {
        let tmp = TempDir::new().unwrap();
        let key = tmp.path().join("key.json");
        std::fs::write(&key, r#"{"project_id": "p"}"#).unwrap();

        let config = StorageConfig {
            data_dir: data_dir(&tmp),
            force_local: true,
            credentials_path: Some(key.to_string_lossy().into_owned()),
            ..Default::default()
        };
        let backend = select_backend(&config).unwrap();
        assert_eq!(backend.kind(), BackendKind::Local);
    }

    #[test]
    fn no_credentials_selects_local() {
        let tmp = TempDir::new().unwrap();
        let config = StorageConfig {
            data_dir: data_dir(&tmp),
            ..Default::default()
        };
        let backend = select_backend(&config).unwrap();
        assert_eq!(backend.kind(), BackendKind::Local);
        assert!(tmp.path().join("data").join("users.json").exists());
    }

    #[test]
    fn missing_credentials_file_falls_back() {
        let tmp = TempDir::new().unwrap();
        let config = StorageConfig {
            data_dir: data_dir(&tmp),
            credentials_path: Some(tmp.path().join("nope.json").to_string_lossy().into_owned()),
            ..Default::default()
        };
        let backend = select_backend(&config).unwrap();
        assert_eq!(backend.kind(), BackendKind::Local);
    }

    #[test]
    fn broken_remote_configuration_falls_back() {
        let tmp = TempDir::new().unwrap();
        let key = tmp.path().join("key.json");
        // No project id anywhere: remote construction fails before any network call.
        std::fs::write(&key, r#"{"type": "service_account"}"#).unwrap();

        let config = StorageConfig {
            data_dir: data_dir(&tmp),
            credentials_path: Some(key.to_string_lossy().into_owned()),
            ..Default::default()
        };
        let backend = select_backend(&config).unwrap();
        assert_eq!(backend.kind(), BackendKind::Local);
    }
}
