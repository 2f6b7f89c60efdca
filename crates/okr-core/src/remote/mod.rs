//! Remote document store adapter.
//!
//! The remote is a per-owner namespace with one sub-collection per
//! [`Collection`], each a set of JSON documents keyed by entity id. Writes
//! issued by mutations are best effort (see [`crate::outbox`]); only the
//! sync engine waits on the remote.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryRemoteStore;
pub use sqlite::SqliteRemoteStore;

use serde_json::Value;
use thiserror::Error;

use crate::model::Collection;

/// Result type alias for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors reported by a remote store.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The store could not be reached.
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    /// The caller may not touch this owner's namespace.
    #[error("Permission denied for {owner}/{collection}")]
    PermissionDenied { owner: String, collection: Collection },

    /// The store refused the write (for a batch: nothing was applied).
    #[error("Remote rejected write: {0}")]
    Rejected(String),

    /// An internal storage error.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Capabilities the core needs from a remote document store.
pub trait RemoteStore {
    /// Read every document in an owner's collection.
    fn list_all(&self, owner: &str, collection: Collection) -> RemoteResult<Vec<Value>>;

    /// Create or replace one document.
    fn put_one(&self, owner: &str, collection: Collection, id: &str, doc: &Value)
        -> RemoteResult<()>;

    /// Delete one document. Deleting a missing document is not an error.
    fn delete_one(&self, owner: &str, collection: Collection, id: &str) -> RemoteResult<()>;

    /// Create or replace many documents as a single all-or-nothing batch.
    fn put_batch(
        &self,
        owner: &str,
        collection: Collection,
        docs: &[(String, Value)],
    ) -> RemoteResult<()>;
}

/// Reject anonymous access. Every document lives under a concrete owner.
pub(crate) fn require_owner(owner: &str, collection: Collection) -> RemoteResult<()> {
    if owner.trim().is_empty() {
        return Err(RemoteError::PermissionDenied {
            owner: owner.to_string(),
            collection,
        });
    }
    Ok(())
}
