//! Password hashing and opaque id generation.
//!
//! Password hashes are a single unsalted SHA-256 digest, hex encoded. This is
//! weak, but it is the format already stored by existing journals in both
//! backends; switching to a salted, iterated KDF changes the stored-hash format
//! and needs a migration of every user record.

use sha2::{Digest, Sha256};

/// Hash a password into the stored representation (lowercase hex SHA-256).
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check a candidate password against a stored hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    hash_password(password) == stored_hash
}

/// Generate a decision id (hyphenated UUID v4).
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Generate a document key for records whose key the remote store assigns.
pub fn generate_document_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
