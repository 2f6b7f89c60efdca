//! Local-first persistence.
//!
//! Two collections (objectives, logs) are stored as whole JSON arrays in a
//! key-value blob store. Every higher-level change is read-all, transform,
//! write-all. There is no cross-caller atomicity: the store assumes a single
//! active writer, and the `Tracker` serializes its own callers.

pub mod file;
pub mod memory;

pub use file::FileBlobStore;
pub use memory::MemoryBlobStore;

use anyhow::{bail, Context, Result};
use tracing::warn;

use crate::model::{Collection, Document, LogEntry, Objective};

/// Trait for key-value blob storage.
pub trait BlobStore {
    /// Read the blob stored under `key`, or `None` if nothing is stored.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous blob.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the blob under `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Validate a blob key for safe use as a file name.
///
/// Rejects empty keys, path separators, traversal sequences, and characters
/// outside the alphanumeric-plus-dash-underscore set.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        bail!("blob key must not be empty");
    }
    if key.contains('/') || key.contains('\\') {
        bail!("blob key must not contain path separators: {key}");
    }
    if key.contains("..") {
        bail!("blob key must not contain '..': {key}");
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        bail!(
            "blob key contains invalid characters (allowed: alphanumeric, dash, underscore): {key}"
        );
    }
    Ok(())
}

/// Typed view of the two local collections over a [`BlobStore`].
pub struct LocalStore {
    blobs: Box<dyn BlobStore + Send + Sync>,
}

impl LocalStore {
    /// Wrap a blob store handle.
    #[must_use]
    pub fn new(blobs: impl BlobStore + Send + Sync + 'static) -> Self {
        Self {
            blobs: Box::new(blobs),
        }
    }

    /// Read a whole collection.
    ///
    /// A missing blob is an empty collection. So is a blob that no longer
    /// parses: corruption is logged and treated as empty rather than fatal.
    pub fn get_all<T: Document>(&self) -> Result<Vec<T>> {
        let key = T::COLLECTION.as_str();
        let Some(raw) = self
            .blobs
            .get(key)
            .with_context(|| format!("Failed to read local collection: {key}"))?
        else {
            return Ok(Vec::new());
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(items) => Ok(items),
            Err(e) => {
                warn!(
                    collection = key,
                    error = %e,
                    "Local collection is unreadable, treating as empty"
                );
                Ok(Vec::new())
            }
        }
    }

    /// Overwrite a whole collection.
    pub fn replace_all<T: Document>(&self, items: &[T]) -> Result<()> {
        let key = T::COLLECTION.as_str();
        let json = serde_json::to_string(items)
            .with_context(|| format!("Failed to serialize local collection: {key}"))?;
        self.blobs
            .set(key, &json)
            .with_context(|| format!("Failed to write local collection: {key}"))
    }

    /// Drop a whole collection.
    pub fn clear(&self, collection: Collection) -> Result<()> {
        self.blobs
            .remove(collection.as_str())
            .with_context(|| format!("Failed to clear local collection: {collection}"))
    }

    pub fn objectives(&self) -> Result<Vec<Objective>> {
        self.get_all()
    }

    pub fn logs(&self) -> Result<Vec<LogEntry>> {
        self.get_all()
    }
}
