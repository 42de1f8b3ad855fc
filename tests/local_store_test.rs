use neurolinker::storage::local::{Collection, LocalFileStore};
use neurolinker::storage::types::{ChatEntry, DecisionInput, RecordId};
use neurolinker::storage::{StorageBackend, StorageError};
use serde_json::Value;
use tempfile::TempDir;

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn open_creates_four_empty_collections() {
    let tmp = TempDir::new().unwrap();
    let store = LocalFileStore::open(tmp.path().join("nested").join("data")).unwrap();

    for collection in Collection::ALL {
        let path = store.collection_path(collection);
        assert!(path.exists(), "{} missing", path.display());
        assert_eq!(read_json(&path), Value::Array(vec![]));
    }
}

#[test]
fn users_and_chats_get_sequential_ids() {
    let tmp = TempDir::new().unwrap();
    let store = LocalFileStore::open(tmp.path()).unwrap();

    assert!(store.create_user("a@x.com", "pw", "A").unwrap());
    assert!(store.create_user("b@x.com", "pw", "B").unwrap());
    let b = store.authenticate_user("b@x.com", "pw").unwrap().unwrap();
    assert_eq!(b, RecordId::Seq(2));

    let first = store.save_chat_message(&b, &ChatEntry::new("q", "a")).unwrap();
    let second = store.save_chat_message(&b, &ChatEntry::new("q", "a")).unwrap();
    assert_eq!(first, RecordId::Seq(1));
    assert_eq!(second, RecordId::Seq(2));

    let users = read_json(&store.collection_path(Collection::Users));
    assert_eq!(users[1]["id"], 2);
    assert_eq!(users[1]["email"], "b@x.com");
    assert_eq!(users[1]["password_hash"].as_str().unwrap().len(), 64);
}

#[test]
fn data_survives_reopening() {
    let tmp = TempDir::new().unwrap();
    let id = {
        let store = LocalFileStore::open(tmp.path()).unwrap();
        store.create_user("p@x.com", "pw", "P").unwrap();
        let owner = store.authenticate_user("p@x.com", "pw").unwrap().unwrap();
        store.save_decision(&owner, &DecisionInput::default()).unwrap()
    };

    let store = LocalFileStore::open(tmp.path()).unwrap();
    let owner = store.authenticate_user("p@x.com", "pw").unwrap().unwrap();
    assert!(store.get_decision(&owner, &id).unwrap().is_some());
}

#[test]
fn corrupt_collection_is_an_error_not_data_loss() {
    let tmp = TempDir::new().unwrap();
    let store = LocalFileStore::open(tmp.path()).unwrap();
    let path = store.collection_path(Collection::Decisions);
    std::fs::write(&path, "[{\"id\": ").unwrap();

    let err = store.get_user_decisions(&RecordId::Seq(1), None).unwrap_err();
    assert!(matches!(err, StorageError::Corrupt { .. }), "{err}");

    let err = store
        .save_decision(&RecordId::Seq(1), &DecisionInput::default())
        .unwrap_err();
    assert!(matches!(err, StorageError::Corrupt { .. }));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[{\"id\": ");
}

#[test]
fn ids_stay_unique_after_records_disappear() {
    let tmp = TempDir::new().unwrap();
    let store = LocalFileStore::open(tmp.path()).unwrap();
    let owner = RecordId::Seq(1);
    for _ in 0..3 {
        store.save_chat_message(&owner, &ChatEntry::new("q", "a")).unwrap();
    }

    // Drop the middle message by hand.
    let path = store.collection_path(Collection::Chat);
    let mut chat = read_json(&path);
    chat.as_array_mut().unwrap().remove(1);
    std::fs::write(&path, serde_json::to_string(&chat).unwrap()).unwrap();

    let next = store.save_chat_message(&owner, &ChatEntry::new("q", "a")).unwrap();
    assert_eq!(next, RecordId::Seq(4));
}
