//! Sync engine: one-shot reconciliation of the local store with the remote
//! store on sign-in.
//!
//! Per collection:
//!
//! 1. Read the whole local collection `L` and remote collection `R`.
//! 2. Start the merged result `M` as a copy of `R`.
//! 3. Append each local item whose id is absent from `R` to `M` and stage it
//!    for upload. On an id collision the remote copy wins verbatim; there is
//!    no timestamp comparison.
//! 4. Commit the staged items as one batch.
//! 5. Sort `M` by creation time, newest first.
//! 6. Overwrite the local collection with `M`.
//!
//! Both collections are read and merged before anything is committed, and
//! both batches are committed before the local store is touched. Any failure
//! or cancellation before step 6 leaves the local store exactly as it was.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::local::LocalStore;
use crate::model::{Collection, Document, LogEntry, Objective};
use crate::remote::{RemoteError, RemoteStore};

/// Errors that abort a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Reading a remote collection failed.
    #[error("Failed to read remote {collection}: {source}")]
    RemoteRead {
        collection: Collection,
        source: RemoteError,
    },

    /// Committing the upload batch failed. Nothing from the batch was applied.
    #[error("Failed to upload {collection} batch: {source}")]
    RemoteCommit {
        collection: Collection,
        source: RemoteError,
    },

    /// A queued local change could not be delivered before reading the
    /// remote. It stays queued.
    #[error("Failed to deliver pending {collection} change {id}: {source}")]
    PendingWrite {
        collection: Collection,
        id: String,
        source: RemoteError,
    },

    /// A document could not be converted to or from its stored form.
    #[error("Malformed {collection} document: {detail}")]
    Codec {
        collection: Collection,
        detail: String,
    },

    /// The local store failed.
    #[error("Local store error: {0}")]
    Local(#[source] anyhow::Error),

    /// The run was cancelled before it touched the local store.
    #[error("Sync cancelled")]
    Cancelled,
}

/// Cooperative cancellation flag shared between a sync run and its owner.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Whether both handles share one flag.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn check(&self) -> Result<(), SyncError> {
        if self.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        Ok(())
    }
}

/// Result of merging one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome<T> {
    /// Remote items plus local-only items, newest first.
    pub merged: Vec<T>,
    /// Local-only items to upload.
    pub upload: Vec<T>,
    /// Local items discarded because the remote had the same id.
    pub conflicts: usize,
}

/// Merge a local and a remote collection, remote winning on id collisions.
#[must_use]
pub fn merge<T: Document>(local: Vec<T>, remote: Vec<T>) -> MergeOutcome<T> {
    let mut seen: HashSet<String> = remote.iter().map(|d| d.id().to_string()).collect();
    let mut merged = remote;
    let mut upload = Vec::new();
    let mut conflicts = 0;

    for item in local {
        if seen.contains(item.id()) {
            conflicts += 1;
            continue;
        }
        seen.insert(item.id().to_string());
        upload.push(item.clone());
        merged.push(item);
    }

    // Stable: equal timestamps keep remote-then-local order
    merged.sort_by(|a, b| b.created_at().cmp(&a.created_at()));

    MergeOutcome {
        merged,
        upload,
        conflicts,
    }
}

/// Per-collection counts for one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    /// Items read from the remote.
    pub remote: usize,
    /// Items read from the local store.
    pub local: usize,
    /// Local-only items uploaded.
    pub uploaded: usize,
    /// Local items replaced by the remote copy.
    pub conflicts: usize,
    /// Items in the merged result.
    pub merged: usize,
}

/// Result of a successful sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub owner: String,
    pub objectives: CollectionReport,
    pub logs: CollectionReport,
}

impl SyncReport {
    #[must_use]
    pub const fn uploaded(&self) -> usize {
        self.objectives.uploaded + self.logs.uploaded
    }
}

struct Pulled<T> {
    outcome: MergeOutcome<T>,
    report: CollectionReport,
}

/// Runs the merge sequence between a local and a remote store.
pub struct SyncEngine<'a> {
    local: &'a LocalStore,
    remote: &'a dyn RemoteStore,
}

impl<'a> SyncEngine<'a> {
    #[must_use]
    pub const fn new(local: &'a LocalStore, remote: &'a dyn RemoteStore) -> Self {
        Self { local, remote }
    }

    /// Reconcile both collections for `owner`.
    ///
    /// On success the local store and the remote hold the same set of ids
    /// for both collections. On error the local store is untouched.
    pub fn run(&self, owner: &str, cancel: &CancelToken) -> Result<SyncReport, SyncError> {
        cancel.check()?;
        debug!(owner, "Sync: reading collections");
        let objectives = self.pull::<Objective>(owner)?;
        let logs = self.pull::<LogEntry>(owner)?;

        cancel.check()?;
        debug!(
            owner,
            objectives = objectives.outcome.upload.len(),
            logs = logs.outcome.upload.len(),
            "Sync: committing uploads"
        );
        self.commit(owner, &objectives.outcome.upload)?;
        self.commit(owner, &logs.outcome.upload)?;

        cancel.check()?;
        self.local
            .replace_all(&objectives.outcome.merged)
            .map_err(SyncError::Local)?;
        self.local
            .replace_all(&logs.outcome.merged)
            .map_err(SyncError::Local)?;

        let report = SyncReport {
            owner: owner.to_string(),
            objectives: objectives.report,
            logs: logs.report,
        };
        info!(
            owner,
            uploaded = report.uploaded(),
            objectives = report.objectives.merged,
            logs = report.logs.merged,
            "Sync complete"
        );
        Ok(report)
    }

    fn pull<T: Document>(&self, owner: &str) -> Result<Pulled<T>, SyncError> {
        let collection = T::COLLECTION;
        let local: Vec<T> = self.local.get_all().map_err(SyncError::Local)?;
        let remote = self
            .remote
            .list_all(owner, collection)
            .map_err(|source| SyncError::RemoteRead { collection, source })?
            .into_iter()
            .map(|doc| {
                serde_json::from_value::<T>(doc).map_err(|e| SyncError::Codec {
                    collection,
                    detail: e.to_string(),
                })
            })
            .collect::<Result<Vec<T>, _>>()?;

        let local_count = local.len();
        let remote_count = remote.len();
        let outcome = merge(local, remote);
        let report = CollectionReport {
            remote: remote_count,
            local: local_count,
            uploaded: outcome.upload.len(),
            conflicts: outcome.conflicts,
            merged: outcome.merged.len(),
        };
        Ok(Pulled { outcome, report })
    }

    fn commit<T: Document>(&self, owner: &str, upload: &[T]) -> Result<(), SyncError> {
        if upload.is_empty() {
            return Ok(());
        }
        let collection = T::COLLECTION;
        let docs = upload
            .iter()
            .map(|item| {
                serde_json::to_value(item)
                    .map(|doc| (item.id().to_string(), doc))
                    .map_err(|e| SyncError::Codec {
                        collection,
                        detail: e.to_string(),
                    })
            })
            .collect::<Result<Vec<(String, Value)>, _>>()?;

        self.remote
            .put_batch(owner, collection, &docs)
            .map_err(|source| SyncError::RemoteCommit { collection, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::MemoryBlobStore;
    use crate::model::{Category, KeyResult, ObjectiveStatus, Quarter};
    use crate::remote::MemoryRemoteStore;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::json;

    const OWNER: &str = "user-1";

    fn ts(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn objective(id: &str, title: &str, minutes: i64) -> Objective {
        Objective {
            id: id.to_string(),
            title: title.to_string(),
            quarter: Quarter::Q1,
            deadline: "2024-03-31".to_string(),
            category: Category::Work,
            status: ObjectiveStatus::NotStarted,
            key_results: vec![KeyResult {
                id: format!("{id}-kr"),
                title: "kr".to_string(),
                current: 0.0,
                target: 10.0,
                unit: String::new(),
            }],
            created_at: ts(minutes),
        }
    }

    fn log(id: &str, minutes: i64) -> LogEntry {
        LogEntry {
            id: id.to_string(),
            content: format!("log {id}"),
            date: "2024-01-01".to_string(),
            linked_kr_id: None,
            progress_delta: 0.0,
            created_at: ts(minutes),
        }
    }

    fn seed_remote(remote: &MemoryRemoteStore, items: &[Objective]) {
        for item in items {
            remote.insert(
                OWNER,
                Collection::Objectives,
                &item.id,
                serde_json::to_value(item).unwrap(),
            );
        }
    }

    fn remote_objectives(remote: &MemoryRemoteStore) -> Vec<Objective> {
        remote
            .documents(OWNER, Collection::Objectives)
            .into_iter()
            .map(|d| serde_json::from_value(d).unwrap())
            .collect()
    }

    fn ids<T: Document>(items: &[T]) -> Vec<String> {
        let mut ids: Vec<String> = items.iter().map(|i| i.id().to_string()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_merge_remote_wins_and_local_only_uploads() {
        let local = vec![objective("a", "A", 1), objective("b", "B local", 2)];
        let remote = vec![objective("b", "B remote", 2), objective("c", "C", 3)];

        let outcome = merge(local, remote);
        assert_eq!(ids(&outcome.merged), vec!["a", "b", "c"]);
        assert_eq!(ids(&outcome.upload), vec!["a"]);
        assert_eq!(outcome.conflicts, 1);
        let b = outcome.merged.iter().find(|o| o.id == "b").unwrap();
        assert_eq!(b.title, "B remote");
    }

    #[test]
    fn test_merge_sorts_newest_first() {
        let local = vec![objective("old", "old", 1), objective("new", "new", 30)];
        let remote = vec![objective("mid", "mid", 10)];

        let merged: Vec<String> = merge(local, remote)
            .merged
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(merged, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_merge_drops_duplicate_local_ids() {
        let local = vec![objective("a", "first", 1), objective("a", "second", 2)];
        let outcome = merge(local, Vec::new());
        assert_eq!(outcome.merged.len(), 1);
        assert_eq!(outcome.upload.len(), 1);
        assert_eq!(outcome.merged[0].title, "first");
    }

    #[test]
    fn test_sync_converges_local_and_remote() {
        let local = LocalStore::new(MemoryBlobStore::new());
        let remote = MemoryRemoteStore::new();
        local
            .replace_all(&[objective("a", "A", 1), objective("b", "B local", 2)])
            .unwrap();
        seed_remote(&remote, &[objective("b", "B remote", 2), objective("c", "C", 3)]);

        let report = SyncEngine::new(&local, &remote)
            .run(OWNER, &CancelToken::new())
            .unwrap();

        assert_eq!(report.objectives.uploaded, 1);
        assert_eq!(report.objectives.conflicts, 1);
        assert_eq!(report.objectives.merged, 3);
        assert_eq!(remote.batch_count(), 1);

        let local_after = local.objectives().unwrap();
        assert_eq!(ids(&local_after), vec!["a", "b", "c"]);
        assert_eq!(ids(&remote_objectives(&remote)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_sync_conflict_keeps_remote_copy_verbatim() {
        let local = LocalStore::new(MemoryBlobStore::new());
        let remote = MemoryRemoteStore::new();

        let mut local_x = objective("x", "edited offline", 5);
        local_x.status = ObjectiveStatus::Completed;
        local.replace_all(&[local_x]).unwrap();
        let remote_x = objective("x", "remote title", 5);
        seed_remote(&remote, &[remote_x.clone()]);

        SyncEngine::new(&local, &remote)
            .run(OWNER, &CancelToken::new())
            .unwrap();

        assert_eq!(local.objectives().unwrap(), vec![remote_x.clone()]);
        assert_eq!(remote_objectives(&remote), vec![remote_x]);
        assert_eq!(remote.write_count(), 0);
    }

    #[test]
    fn test_second_sync_is_idempotent() {
        let local = LocalStore::new(MemoryBlobStore::new());
        let remote = MemoryRemoteStore::new();
        local
            .replace_all(&[objective("a", "A", 1), objective("b", "B", 2)])
            .unwrap();
        local.replace_all(&[log("l1", 1)]).unwrap();
        seed_remote(&remote, &[objective("b", "B", 2), objective("c", "C", 3)]);

        let engine = SyncEngine::new(&local, &remote);
        let first = engine.run(OWNER, &CancelToken::new()).unwrap();
        assert_eq!(first.uploaded(), 2);
        let writes_after_first = remote.write_count();
        let objectives_after_first = local.objectives().unwrap();

        let second = engine.run(OWNER, &CancelToken::new()).unwrap();
        assert_eq!(second.uploaded(), 0);
        assert_eq!(remote.write_count(), writes_after_first);
        assert_eq!(local.objectives().unwrap(), objectives_after_first);
        assert_eq!(second.objectives.merged, 3);
        assert_eq!(second.logs.merged, 1);
    }

    #[test]
    fn test_collections_sync_independently() {
        let local = LocalStore::new(MemoryBlobStore::new());
        let remote = MemoryRemoteStore::new();
        local.replace_all(&[log("l1", 1), log("l2", 2)]).unwrap();
        remote.insert(
            OWNER,
            Collection::Logs,
            "l3",
            serde_json::to_value(log("l3", 3)).unwrap(),
        );

        let report = SyncEngine::new(&local, &remote)
            .run(OWNER, &CancelToken::new())
            .unwrap();

        assert_eq!(report.logs.uploaded, 2);
        assert_eq!(report.objectives, CollectionReport::default());
        let logs: Vec<String> = local.logs().unwrap().into_iter().map(|l| l.id).collect();
        assert_eq!(logs, vec!["l3", "l2", "l1"]);
        assert_eq!(remote.documents(OWNER, Collection::Logs).len(), 3);
    }

    #[test]
    fn test_remote_read_failure_leaves_local_untouched() {
        let blobs = MemoryBlobStore::new();
        let local = LocalStore::new(blobs.clone());
        let remote = MemoryRemoteStore::new();
        local.replace_all(&[objective("a", "A", 1)]).unwrap();
        let before = blobs.raw("objectives");
        remote.fail_reads(true);

        let err = SyncEngine::new(&local, &remote)
            .run(OWNER, &CancelToken::new())
            .unwrap_err();

        assert!(matches!(err, SyncError::RemoteRead { .. }));
        assert_eq!(blobs.raw("objectives"), before);
    }

    #[test]
    fn test_commit_failure_leaves_local_untouched() {
        let blobs = MemoryBlobStore::new();
        let local = LocalStore::new(blobs.clone());
        let remote = MemoryRemoteStore::new();
        local.replace_all(&[objective("a", "A", 1)]).unwrap();
        seed_remote(&remote, &[objective("c", "C", 3)]);
        let before = blobs.raw("objectives");
        remote.fail_writes(true);

        let err = SyncEngine::new(&local, &remote)
            .run(OWNER, &CancelToken::new())
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::RemoteCommit {
                collection: Collection::Objectives,
                ..
            }
        ));
        assert_eq!(blobs.raw("objectives"), before);
        assert_eq!(ids(&local.objectives().unwrap()), vec!["a"]);
    }

    #[test]
    fn test_cancelled_sync_does_nothing() {
        let blobs = MemoryBlobStore::new();
        let local = LocalStore::new(blobs.clone());
        let remote = MemoryRemoteStore::new();
        local.replace_all(&[objective("a", "A", 1)]).unwrap();
        let before = blobs.raw("objectives");

        let token = CancelToken::new();
        token.cancel();
        let err = SyncEngine::new(&local, &remote)
            .run(OWNER, &token)
            .unwrap_err();

        assert!(matches!(err, SyncError::Cancelled));
        assert_eq!(remote.write_count(), 0);
        assert_eq!(blobs.raw("objectives"), before);
    }

    #[test]
    fn test_malformed_remote_document_aborts() {
        let blobs = MemoryBlobStore::new();
        let local = LocalStore::new(blobs.clone());
        let remote = MemoryRemoteStore::new();
        local.replace_all(&[objective("a", "A", 1)]).unwrap();
        let before = blobs.raw("objectives");
        remote.insert(OWNER, Collection::Objectives, "bad", json!({"title": "no id"}));

        let err = SyncEngine::new(&local, &remote)
            .run(OWNER, &CancelToken::new())
            .unwrap_err();

        assert!(matches!(err, SyncError::Codec { .. }));
        assert_eq!(blobs.raw("objectives"), before);
    }

    #[test]
    fn test_sync_with_nothing_anywhere() {
        let local = LocalStore::new(MemoryBlobStore::new());
        let remote = MemoryRemoteStore::new();
        let report = SyncEngine::new(&local, &remote)
            .run(OWNER, &CancelToken::new())
            .unwrap();
        assert_eq!(report.uploaded(), 0);
        assert_eq!(remote.batch_count(), 0);
        assert!(local.objectives().unwrap().is_empty());
    }
}
