//! In-process remote store with failure injection.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use serde_json::Value;

use super::{require_owner, RemoteError, RemoteResult, RemoteStore};
use crate::model::Collection;

#[derive(Debug, Default)]
struct Inner {
    docs: BTreeMap<(String, Collection), BTreeMap<String, Value>>,
    fail_reads: bool,
    fail_writes: bool,
    writes: usize,
    batches: usize,
}

/// Remote store kept in memory.
///
/// Clones share state. Reads and writes can be made to fail to exercise the
/// error paths of sync and the outbox.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemoteStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryRemoteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read fail with `Unavailable`.
    pub fn fail_reads(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_reads = fail;
        }
    }

    /// Make every write fail with `Unavailable`.
    pub fn fail_writes(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_writes = fail;
        }
    }

    /// Number of documents written so far (batched documents count individually).
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.inner.lock().map_or(0, |inner| inner.writes)
    }

    /// Number of batches committed so far.
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.inner.lock().map_or(0, |inner| inner.batches)
    }

    /// Seed a document without counting it as a write.
    pub fn insert(&self, owner: &str, collection: Collection, id: &str, doc: Value) {
        if let Ok(mut inner) = self.inner.lock() {
            inner
                .docs
                .entry((owner.to_string(), collection))
                .or_default()
                .insert(id.to_string(), doc);
        }
    }

    /// Snapshot of one collection, ordered by id.
    #[must_use]
    pub fn documents(&self, owner: &str, collection: Collection) -> Vec<Value> {
        self.inner.lock().map_or_else(
            |_| Vec::new(),
            |inner| {
                inner
                    .docs
                    .get(&(owner.to_string(), collection))
                    .map(|docs| docs.values().cloned().collect())
                    .unwrap_or_default()
            },
        )
    }

    fn lock(&self) -> RemoteResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| RemoteError::Internal(anyhow!("memory remote store lock poisoned")))
    }

    fn writable(&self) -> RemoteResult<MutexGuard<'_, Inner>> {
        let inner = self.lock()?;
        if inner.fail_writes {
            return Err(RemoteError::Unavailable("writes disabled".to_string()));
        }
        Ok(inner)
    }
}

impl RemoteStore for MemoryRemoteStore {
    fn list_all(&self, owner: &str, collection: Collection) -> RemoteResult<Vec<Value>> {
        require_owner(owner, collection)?;
        let fail = self.lock()?.fail_reads;
        if fail {
            return Err(RemoteError::Unavailable("reads disabled".to_string()));
        }
        Ok(self.documents(owner, collection))
    }

    fn put_one(
        &self,
        owner: &str,
        collection: Collection,
        id: &str,
        doc: &Value,
    ) -> RemoteResult<()> {
        require_owner(owner, collection)?;
        let mut inner = self.writable()?;
        inner
            .docs
            .entry((owner.to_string(), collection))
            .or_default()
            .insert(id.to_string(), doc.clone());
        inner.writes += 1;
        Ok(())
    }

    fn delete_one(&self, owner: &str, collection: Collection, id: &str) -> RemoteResult<()> {
        require_owner(owner, collection)?;
        let mut inner = self.writable()?;
        if let Some(docs) = inner.docs.get_mut(&(owner.to_string(), collection)) {
            docs.remove(id);
        }
        inner.writes += 1;
        Ok(())
    }

    fn put_batch(
        &self,
        owner: &str,
        collection: Collection,
        docs: &[(String, Value)],
    ) -> RemoteResult<()> {
        require_owner(owner, collection)?;
        let mut inner = self.writable()?;
        let target = inner
            .docs
            .entry((owner.to_string(), collection))
            .or_default();
        for (id, doc) in docs {
            target.insert(id.clone(), doc.clone());
        }
        inner.writes += docs.len();
        inner.batches += 1;
        Ok(())
    }
}
