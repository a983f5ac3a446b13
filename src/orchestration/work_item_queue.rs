//! # Work Item Queue
//!
//! Ordered holding area for the individual analysis items of every live
//! batch. Ordering is strict priority-then-FIFO: higher batch priority
//! first, and within equal priority the enqueue sequence number - never
//! wall-clock time, so ordering stays deterministic under clock skew.
//!
//! The queue also owns per-batch admission: each batch registers its
//! concurrency cap at enqueue, and `dequeue` hands out items only for
//! batches below their cap, tracked as in-flight leases. That keeps one
//! saturated batch from parking workers that other batches could use,
//! without any worker-side blocking.
//!
//! Cancellation removes a batch's pending items inside one critical
//! section, so a concurrent dequeue either sees an item or sees it gone -
//! never a half-cancelled batch.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::WorkItem;

/// Queue errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueueError {
    #[error("Queue is closed")]
    Closed,

    #[error("Batch {batch_id} already enqueued")]
    BatchAlreadyEnqueued { batch_id: Uuid },
}

/// Ordering key: higher priority first, then enqueue order within the
/// same priority. Derived lexicographic ordering does the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct QueueKey {
    priority_rank: Reverse<i32>,
    seq: u64,
}

/// Per-batch bookkeeping: pending item keys, admission cap, and the
/// number of items currently leased to workers.
#[derive(Debug)]
struct BatchEntry {
    pending: BTreeSet<QueueKey>,
    max_in_flight: usize,
    in_flight: usize,
}

#[derive(Debug, Default)]
struct QueueInner {
    ready: BTreeMap<QueueKey, WorkItem>,
    batches: HashMap<Uuid, BatchEntry>,
    next_seq: u64,
    closed: bool,
}

/// Priority FIFO queue with per-batch admission control.
#[derive(Debug, Default)]
pub struct WorkItemQueue {
    inner: Mutex<QueueInner>,
    notify: Notify,
}

impl WorkItemQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit all items of a batch atomically, tagged with the batch's
    /// priority and concurrency cap. All-or-nothing: on error nothing is
    /// enqueued.
    pub fn enqueue_batch(
        &self,
        batch_id: Uuid,
        items: Vec<WorkItem>,
        priority: i32,
        max_in_flight: usize,
    ) -> Result<(), QueueError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(QueueError::Closed);
        }
        if inner.batches.contains_key(&batch_id) {
            return Err(QueueError::BatchAlreadyEnqueued { batch_id });
        }

        let mut entry = BatchEntry {
            pending: BTreeSet::new(),
            max_in_flight: max_in_flight.max(1),
            in_flight: 0,
        };
        for item in items {
            let key = QueueKey {
                priority_rank: Reverse(priority),
                seq: inner.next_seq,
            };
            inner.next_seq += 1;
            entry.pending.insert(key);
            inner.ready.insert(key, item);
        }
        let admitted = entry.pending.len();
        inner.batches.insert(batch_id, entry);
        drop(inner);

        debug!(batch_id = %batch_id, items = admitted, priority, "Batch admitted to queue");
        self.notify.notify_waiters();
        Ok(())
    }

    /// Re-admit an item after a retry delay, at its batch's original
    /// priority. Returns `false` (dropping the item) when the batch has
    /// been cancelled or finalized in the meantime, or the queue closed.
    pub fn requeue(&self, item: WorkItem, priority: i32) -> bool {
        let mut inner = self.inner.lock();
        if inner.closed || !inner.batches.contains_key(&item.batch_id) {
            return false;
        }

        let batch_id = item.batch_id;
        let key = QueueKey {
            priority_rank: Reverse(priority),
            seq: inner.next_seq,
        };
        inner.next_seq += 1;
        inner.ready.insert(key, item);
        if let Some(entry) = inner.batches.get_mut(&batch_id) {
            entry.pending.insert(key);
        }
        drop(inner);

        self.notify.notify_waiters();
        true
    }

    /// Take the highest-priority, oldest-within-priority item whose batch
    /// is below its concurrency cap, waiting when nothing is eligible.
    ///
    /// Returns `None` only after `close()`. Every returned item holds an
    /// in-flight lease that the caller must give back with `release`.
    pub async fn dequeue(&self) -> Option<WorkItem> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register interest before checking so a wakeup between the
            // check and the await is not lost
            notified.as_mut().enable();

            {
                let mut inner = self.inner.lock();
                if inner.closed {
                    return None;
                }
                if let Some(key) = Self::next_eligible_key(&inner) {
                    let item = inner.ready.remove(&key).expect("ready key must exist");
                    let entry = inner
                        .batches
                        .get_mut(&item.batch_id)
                        .expect("batch entry must exist for pending item");
                    entry.pending.remove(&key);
                    entry.in_flight += 1;
                    return Some(item);
                }
            }

            notified.await;
        }
    }

    /// Return an in-flight lease for a batch, waking a waiter that may
    /// now be under the batch's cap.
    pub fn release(&self, batch_id: Uuid) {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.batches.get_mut(&batch_id) {
            entry.in_flight = entry.in_flight.saturating_sub(1);
        }
        drop(inner);
        self.notify.notify_waiters();
    }

    /// Remove every not-yet-dequeued item of a batch and refuse future
    /// re-enqueues for it. Atomic with respect to concurrent dequeues.
    /// Returns the number of pending items removed.
    pub fn cancel_batch(&self, batch_id: Uuid) -> usize {
        let mut inner = self.inner.lock();
        let Some(entry) = inner.batches.remove(&batch_id) else {
            return 0;
        };
        let removed = entry.pending.len();
        for key in &entry.pending {
            inner.ready.remove(key);
        }
        drop(inner);

        if removed > 0 {
            debug!(batch_id = %batch_id, removed, "Removed pending items for cancelled batch");
        }
        self.notify.notify_waiters();
        removed
    }

    /// Drop a finished batch's admission bookkeeping. Pending items
    /// should already be drained; any stragglers are discarded.
    pub fn forget_batch(&self, batch_id: Uuid) {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.batches.remove(&batch_id) {
            if !entry.pending.is_empty() {
                warn!(
                    batch_id = %batch_id,
                    pending = entry.pending.len(),
                    "Forgetting batch with items still pending"
                );
            }
            for key in &entry.pending {
                inner.ready.remove(key);
            }
        }
    }

    /// Close the queue; blocked and future `dequeue` calls return `None`.
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.notify.notify_waiters();
    }

    /// Number of items waiting to be dequeued
    pub fn pending_len(&self) -> usize {
        self.inner.lock().ready.len()
    }

    /// Number of pending items belonging to one batch
    pub fn pending_for_batch(&self, batch_id: Uuid) -> usize {
        self.inner
            .lock()
            .batches
            .get(&batch_id)
            .map_or(0, |entry| entry.pending.len())
    }

    fn next_eligible_key(inner: &QueueInner) -> Option<QueueKey> {
        inner
            .ready
            .iter()
            .find(|(_, item)| {
                inner
                    .batches
                    .get(&item.batch_id)
                    .is_some_and(|entry| entry.in_flight < entry.max_in_flight)
            })
            .map(|(key, _)| *key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn items_for(batch_id: Uuid, count: u32) -> Vec<WorkItem> {
        (0..count)
            .map(|i| WorkItem::new(batch_id, i, json!({ "item": i })))
            .collect()
    }

    #[tokio::test]
    async fn test_fifo_within_priority() {
        let queue = WorkItemQueue::new();
        let batch = Uuid::new_v4();
        queue.enqueue_batch(batch, items_for(batch, 3), 1, 8).unwrap();

        for expected in 0..3 {
            let item = queue.dequeue().await.unwrap();
            assert_eq!(item.index, expected);
        }
    }

    #[tokio::test]
    async fn test_higher_priority_dequeues_first() {
        let queue = WorkItemQueue::new();
        let low = Uuid::new_v4();
        let high = Uuid::new_v4();
        queue.enqueue_batch(low, items_for(low, 2), 1, 8).unwrap();
        queue.enqueue_batch(high, items_for(high, 2), 5, 8).unwrap();

        assert_eq!(queue.dequeue().await.unwrap().batch_id, high);
        assert_eq!(queue.dequeue().await.unwrap().batch_id, high);
        assert_eq!(queue.dequeue().await.unwrap().batch_id, low);
    }

    #[tokio::test]
    async fn test_admission_cap_skips_saturated_batch() {
        let queue = WorkItemQueue::new();
        let capped = Uuid::new_v4();
        let other = Uuid::new_v4();
        // capped batch has higher priority but only one lease
        queue.enqueue_batch(capped, items_for(capped, 2), 5, 1).unwrap();
        queue.enqueue_batch(other, items_for(other, 1), 1, 8).unwrap();

        let first = queue.dequeue().await.unwrap();
        assert_eq!(first.batch_id, capped);

        // capped batch is saturated, so the lower-priority batch runs next
        let second = queue.dequeue().await.unwrap();
        assert_eq!(second.batch_id, other);

        // releasing the lease makes the capped batch eligible again
        queue.release(capped);
        let third = queue.dequeue().await.unwrap();
        assert_eq!(third.batch_id, capped);
    }

    #[tokio::test]
    async fn test_cancel_removes_pending_and_refuses_requeue() {
        let queue = WorkItemQueue::new();
        let batch = Uuid::new_v4();
        queue.enqueue_batch(batch, items_for(batch, 3), 1, 8).unwrap();

        let in_flight = queue.dequeue().await.unwrap();
        assert_eq!(queue.cancel_batch(batch), 2);
        assert_eq!(queue.pending_len(), 0);

        // a retry of the in-flight item is dropped after cancellation
        assert!(!queue.requeue(in_flight.next_attempt(), 1));
    }

    #[tokio::test]
    async fn test_dequeue_blocks_until_enqueue() {
        let queue = std::sync::Arc::new(WorkItemQueue::new());
        let batch = Uuid::new_v4();

        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.dequeue().await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        queue.enqueue_batch(batch, items_for(batch, 1), 1, 8).unwrap();
        let item = waiter.await.unwrap().unwrap();
        assert_eq!(item.batch_id, batch);
    }

    #[tokio::test]
    async fn test_close_unblocks_waiters() {
        let queue = std::sync::Arc::new(WorkItemQueue::new());
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.dequeue().await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        queue.close();
        assert!(waiter.await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_batch_rejected() {
        let queue = WorkItemQueue::new();
        let batch = Uuid::new_v4();
        queue.enqueue_batch(batch, items_for(batch, 1), 1, 8).unwrap();
        assert!(matches!(
            queue.enqueue_batch(batch, items_for(batch, 1), 1, 8),
            Err(QueueError::BatchAlreadyEnqueued { .. })
        ));
    }
}
