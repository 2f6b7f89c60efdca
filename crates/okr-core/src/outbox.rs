//! Best-effort outbox for remote writes.
//!
//! Mutations succeed locally and queue their remote mirror here. The shell
//! drains the queue with [`Outbox::flush`] from its event loop. Every write
//! is attempted once: failures are logged and reported to the observer,
//! never retried, and never surfaced to the mutation that queued them.
//! The exception is [`Outbox::flush_owner`], run before a sync, which keeps
//! undelivered writes queued so the sync can abort without losing them.
//!
//! The queue is bounded. A newer write for the same document replaces the
//! queued one in place; when the queue is full the oldest write is dropped.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, warn};

use crate::model::Collection;
use crate::remote::{RemoteError, RemoteStore};

/// Default queue bound.
pub const DEFAULT_CAPACITY: usize = 256;

/// Operation to mirror remotely.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create or replace the full document.
    Put(Value),
    /// Delete the document.
    Delete,
}

impl WriteOp {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Put(_) => "put",
            Self::Delete => "delete",
        }
    }
}

/// A queued remote write.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub owner: String,
    pub collection: Collection,
    pub id: String,
    pub op: WriteOp,
}

impl PendingWrite {
    fn same_target(&self, other: &Self) -> bool {
        self.owner == other.owner && self.collection == other.collection && self.id == other.id
    }
}

/// What happened to a queued write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Failed(String),
    /// Evicted before delivery because the queue was full.
    Dropped,
}

/// Outcome of one write, passed to the observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub collection: Collection,
    pub id: String,
    pub op: &'static str,
    pub outcome: Delivery,
}

/// Totals for one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Callback invoked for every delivery outcome.
pub type OutboxObserver = Arc<dyn Fn(&DeliveryReport) + Send + Sync>;

/// Bounded queue of pending remote writes.
pub struct Outbox {
    queue: Mutex<VecDeque<PendingWrite>>,
    capacity: usize,
    observer: Mutex<Option<OutboxObserver>>,
}

impl Outbox {
    /// Create an outbox holding at most `capacity` writes (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            observer: Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Install the delivery observer, replacing any previous one.
    pub fn set_observer(&self, observer: OutboxObserver) {
        *lock(&self.observer) = Some(observer);
    }

    /// Queue a write.
    pub fn enqueue(&self, write: PendingWrite) {
        let dropped = {
            let mut queue = lock(&self.queue);
            if let Some(existing) = queue.iter_mut().find(|w| w.same_target(&write)) {
                existing.op = write.op;
                None
            } else {
                let evicted = if queue.len() >= self.capacity {
                    queue.pop_front()
                } else {
                    None
                };
                queue.push_back(write);
                evicted
            }
        };

        if let Some(evicted) = dropped {
            warn!(
                collection = %evicted.collection,
                id = %evicted.id,
                op = evicted.op.kind(),
                "Outbox full, dropping oldest remote write"
            );
            self.notify(&DeliveryReport {
                collection: evicted.collection,
                id: evicted.id,
                op: evicted.op.kind(),
                outcome: Delivery::Dropped,
            });
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.queue).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.queue).is_empty()
    }

    /// Snapshot of the queued writes, oldest first.
    #[must_use]
    pub fn pending(&self) -> Vec<PendingWrite> {
        lock(&self.queue).iter().cloned().collect()
    }

    /// Attempt every queued write once, in queue order.
    pub fn flush(&self, remote: &dyn RemoteStore) -> FlushReport {
        let batch: Vec<PendingWrite> = lock(&self.queue).drain(..).collect();
        let mut report = FlushReport::default();

        for write in batch {
            if self.deliver(&write, remote).is_ok() {
                report.delivered += 1;
            } else {
                report.failed += 1;
            }
        }

        report
    }

    /// Deliver `owner`'s queued writes in order, stopping at the first failure.
    ///
    /// Used before a sync reads the remote, so the remote already reflects
    /// every local change. On failure the failed write and everything queued
    /// after it for `owner` go back to the front of the queue, and the error
    /// is returned with the failed write. Writes for other owners stay queued.
    pub fn flush_owner(
        &self,
        owner: &str,
        remote: &dyn RemoteStore,
    ) -> Result<FlushReport, (PendingWrite, RemoteError)> {
        let batch: Vec<PendingWrite> = {
            let mut queue = lock(&self.queue);
            let (mine, rest): (VecDeque<_>, VecDeque<_>) =
                queue.drain(..).partition(|w| w.owner == owner);
            *queue = rest;
            mine.into()
        };
        let mut report = FlushReport::default();

        let mut writes = batch.into_iter();
        while let Some(write) = writes.next() {
            if let Err(e) = self.deliver(&write, remote) {
                self.requeue_front(std::iter::once(write.clone()).chain(writes));
                return Err((write, e));
            }
            report.delivered += 1;
        }

        Ok(report)
    }

    /// Put undelivered writes back at the head of the queue, oldest first.
    ///
    /// A write whose document was queued again meanwhile is superseded and
    /// not restored.
    fn requeue_front(&self, writes: impl DoubleEndedIterator<Item = PendingWrite>) {
        let mut queue = lock(&self.queue);
        for write in writes.rev() {
            if !queue.iter().any(|w| w.same_target(&write)) {
                queue.push_front(write);
            }
        }
    }

    fn deliver(&self, write: &PendingWrite, remote: &dyn RemoteStore) -> Result<(), RemoteError> {
        let result = match &write.op {
            WriteOp::Put(doc) => remote.put_one(&write.owner, write.collection, &write.id, doc),
            WriteOp::Delete => remote.delete_one(&write.owner, write.collection, &write.id),
        };

        let outcome = match &result {
            Ok(()) => {
                debug!(
                    collection = %write.collection,
                    id = %write.id,
                    op = write.op.kind(),
                    "Remote write delivered"
                );
                Delivery::Delivered
            }
            Err(e) => {
                warn!(
                    collection = %write.collection,
                    id = %write.id,
                    op = write.op.kind(),
                    error = %e,
                    "Remote write failed"
                );
                Delivery::Failed(e.to_string())
            }
        };

        self.notify(&DeliveryReport {
            collection: write.collection,
            id: write.id.clone(),
            op: write.op.kind(),
            outcome,
        });
        result
    }

    fn notify(&self, report: &DeliveryReport) {
        let observer = lock(&self.observer).clone();
        if let Some(observer) = observer {
            observer(report);
        }
    }
}

impl Default for Outbox {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
