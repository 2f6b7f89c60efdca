//! In-process blob store.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, bail, Result};

use super::BlobStore;

#[derive(Debug, Default)]
struct Inner {
    blobs: HashMap<String, String>,
    failing: HashSet<String>,
}

/// Blob store kept in memory.
///
/// Clones share the same underlying map, so a test can hand one clone to a
/// `Tracker` and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make writes to `key` fail (or succeed again).
    pub fn fail_writes(&self, key: &str, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            if fail {
                inner.failing.insert(key.to_string());
            } else {
                inner.failing.remove(key);
            }
        }
    }

    /// Raw blob under `key`, bypassing the trait.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.blobs.get(key).cloned())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("memory blob store lock poisoned"))
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.blobs.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.failing.contains(key) {
            bail!("write to '{key}' rejected");
        }
        inner.blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.blobs.remove(key);
        Ok(())
    }
}
