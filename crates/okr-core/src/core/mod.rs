//! Service layer for okr-core.
//!
//! Provides typed, high-level APIs for objective, key result, log, and sync
//! operations. The [`Tracker`] owns the local store, the remote handle, the
//! session, and the outbox; services borrow it for the duration of a call.
//!
//! # Usage
//!
//! ```no_run
//! use std::path::Path;
//! use okr_core::config::TrackerConfig;
//! use okr_core::core::Tracker;
//!
//! let tracker = Tracker::open(&TrackerConfig::in_dir(Path::new("/tmp/okr"))).unwrap();
//! let objectives = tracker.objectives().all().unwrap();
//! ```

pub mod errors;
pub mod key_results;
pub mod logs;
pub mod objectives;
pub mod sync;
mod validate;

pub use errors::{CoreError, CoreResult};
pub use logs::{LogOutcome, ProgressUpdate};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::config::TrackerConfig;
use crate::identity::Session;
use crate::local::{FileBlobStore, LocalStore};
use crate::model::{Collection, Document};
use crate::outbox::{FlushReport, Outbox, OutboxObserver, PendingWrite, WriteOp};
use crate::remote::{RemoteStore, SqliteRemoteStore};
use crate::sync::CancelToken;

/// Shared remote handle.
pub type SharedRemote = Arc<dyn RemoteStore + Send + Sync>;

/// Facade providing all okr service APIs.
///
/// Mutations and sync both take the write gate, so a sync never observes a
/// half-applied mutation and a mutation never lands between a sync's read
/// and its local overwrite.
pub struct Tracker {
    local: LocalStore,
    remote: SharedRemote,
    outbox: Outbox,
    session: Mutex<Session>,
    gate: Mutex<()>,
    running_sync: Mutex<Option<CancelToken>>,
}

impl Tracker {
    /// Build a tracker over explicit store handles. Starts signed out.
    #[must_use]
    pub fn new(local: LocalStore, remote: SharedRemote, outbox_capacity: usize) -> Self {
        Self {
            local,
            remote,
            outbox: Outbox::new(outbox_capacity),
            session: Mutex::new(Session::signed_out()),
            gate: Mutex::new(()),
            running_sync: Mutex::new(None),
        }
    }

    /// Open the file-backed local store and the SQLite remote named by `config`.
    pub fn open(config: &TrackerConfig) -> CoreResult<Self> {
        let blobs = FileBlobStore::open_or_create(&config.data_dir).map_err(CoreError::Internal)?;
        let remote = SqliteRemoteStore::open(&config.remote_path).map_err(CoreError::Internal)?;
        debug!(
            data_dir = %config.data_dir.display(),
            remote = %config.remote_path.display(),
            "Opened tracker"
        );
        Ok(Self::new(
            LocalStore::new(blobs),
            Arc::new(remote),
            config.outbox_capacity,
        ))
    }

    /// Access objective operations.
    #[must_use]
    pub fn objectives(&self) -> objectives::ObjectiveService<'_> {
        objectives::ObjectiveService::new(self)
    }

    /// Access key result operations.
    #[must_use]
    pub fn key_results(&self) -> key_results::KeyResultService<'_> {
        key_results::KeyResultService::new(self)
    }

    /// Access progress log operations.
    #[must_use]
    pub fn logs(&self) -> logs::LogService<'_> {
        logs::LogService::new(self)
    }

    /// Access session and sync operations.
    #[must_use]
    pub fn sync(&self) -> sync::SyncService<'_> {
        sync::SyncService::new(self)
    }

    /// Get a reference to the local store.
    #[must_use]
    pub const fn local(&self) -> &LocalStore {
        &self.local
    }

    #[must_use]
    pub fn remote(&self) -> &(dyn RemoteStore + Send + Sync) {
        self.remote.as_ref()
    }

    #[must_use]
    pub const fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Current signed-in owner, if any.
    #[must_use]
    pub fn owner(&self) -> Option<String> {
        lock(&self.session).owner().map(str::to_string)
    }

    /// Install a hook that sees every remote write outcome.
    pub fn set_outbox_observer(&self, observer: OutboxObserver) {
        self.outbox.set_observer(observer);
    }

    /// Deliver queued remote writes. Call from the shell's event loop.
    pub fn flush_outbox(&self) -> FlushReport {
        self.outbox.flush(self.remote.as_ref())
    }

    pub(crate) fn write_gate(&self) -> MutexGuard<'_, ()> {
        lock(&self.gate)
    }

    pub(crate) fn session(&self) -> MutexGuard<'_, Session> {
        lock(&self.session)
    }

    pub(crate) fn running_sync(&self) -> MutexGuard<'_, Option<CancelToken>> {
        lock(&self.running_sync)
    }

    /// Queue a remote upsert of `doc` for the signed-in owner.
    ///
    /// Signed out, the change stays local.
    pub(crate) fn mirror_put<T: Document>(&self, doc: &T) {
        let Some(owner) = self.owner() else {
            return;
        };
        let collection = T::COLLECTION;
        match serde_json::to_value(doc) {
            Ok(value) => self.outbox.enqueue(PendingWrite {
                owner,
                collection,
                id: doc.id().to_string(),
                op: WriteOp::Put(value),
            }),
            Err(e) => warn!(
                collection = %collection,
                id = doc.id(),
                error = %e,
                "Skipping remote mirror of unencodable document"
            ),
        }
    }

    /// Queue a remote delete for the signed-in owner.
    pub(crate) fn mirror_delete(&self, collection: Collection, id: &str) {
        if let Some(owner) = self.owner() {
            self.outbox.enqueue(PendingWrite {
                owner,
                collection,
                id: id.to_string(),
                op: WriteOp::Delete,
            });
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::identity::AuthEvent;
    use crate::local::MemoryBlobStore;
    use crate::remote::MemoryRemoteStore;

    pub struct Harness {
        pub tracker: Tracker,
        pub blobs: MemoryBlobStore,
        pub remote: MemoryRemoteStore,
    }

    impl Harness {
        pub fn new() -> Self {
            let blobs = MemoryBlobStore::new();
            let remote = MemoryRemoteStore::new();
            let tracker = Tracker::new(
                LocalStore::new(blobs.clone()),
                Arc::new(remote.clone()),
                crate::outbox::DEFAULT_CAPACITY,
            );
            Self {
                tracker,
                blobs,
                remote,
            }
        }

        /// Signed in as `owner`, with the initial sync already run.
        pub fn signed_in(owner: &str) -> Self {
            let harness = Self::new();
            harness
                .tracker
                .sync()
                .handle_auth_event(&AuthEvent::SignedIn {
                    owner_id: owner.to_string(),
                })
                .unwrap();
            harness
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::Harness;
    use super::*;
    use crate::model::Objective;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_stores() {
        let dir = tempdir().unwrap();
        let config = TrackerConfig::in_dir(&dir.path().join("okr"));
        let tracker = Tracker::open(&config).unwrap();
        assert!(tracker.objectives().all().unwrap().is_empty());
        assert!(config.remote_path.exists());
        assert_eq!(tracker.outbox().capacity(), config.outbox_capacity);
    }

    #[test]
    fn test_signed_out_mutations_stay_local() {
        let h = Harness::new();
        let obj = Objective {
            id: "obj-1".to_string(),
            ..Objective::default()
        };
        h.tracker.mirror_put(&obj);
        h.tracker.mirror_delete(Collection::Objectives, "obj-1");
        assert!(h.tracker.outbox().is_empty());
    }

    #[test]
    fn test_signed_in_mirror_reaches_remote_on_flush() {
        let h = Harness::signed_in("u1");
        let obj = Objective {
            id: "obj-1".to_string(),
            ..Objective::default()
        };
        h.tracker.mirror_put(&obj);
        assert_eq!(h.tracker.outbox().len(), 1);

        let report = h.tracker.flush_outbox();
        assert_eq!(report.delivered, 1);
        assert_eq!(h.remote.documents("u1", Collection::Objectives).len(), 1);
    }
}
