//! Pending-request queue: priority first, submission order second.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

/// Request priority. Higher priorities drain first; requests of equal
/// priority drain in submission order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// A deferred operation that delivers its outcome to the waiter it was
/// created with. Dropping it without running releases that waiter with a
/// cancellation outcome.
pub(crate) type QueuedJob = BoxFuture<'static, ()>;

pub(crate) struct QueuedRequest {
    pub id: Uuid,
    pub priority: Priority,
    pub enqueued_at: Instant,
    /// Monotonic submission counter; FIFO tiebreak within a priority tier
    /// must not depend on clock resolution.
    pub seq: u64,
    pub job: QueuedJob,
}

/// Queue order: priority descending, then submission order ascending.
fn sort_key(priority: Priority, seq: u64) -> (std::cmp::Reverse<Priority>, u64) {
    (std::cmp::Reverse(priority), seq)
}

/// Queue kept sorted by priority descending, then submission order ascending.
pub(crate) struct PendingQueue {
    items: Vec<QueuedRequest>,
    next_seq: u64,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            next_seq: 0,
        }
    }

    /// Insert at the sorted position and return the request id.
    pub fn insert(&mut self, priority: Priority, job: QueuedJob) -> Uuid {
        let id = Uuid::new_v4();
        let request = QueuedRequest {
            id,
            priority,
            enqueued_at: Instant::now(),
            seq: self.next_seq,
            job,
        };
        self.next_seq += 1;
        let key = sort_key(request.priority, request.seq);
        let pos = self
            .items
            .partition_point(|q| sort_key(q.priority, q.seq) <= key);
        self.items.insert(pos, request);
        id
    }

    pub fn pop_front(&mut self) -> Option<QueuedRequest> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.items.remove(0))
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drain everything; callers release the waiters by dropping the jobs.
    pub fn clear(&mut self) -> Vec<QueuedRequest> {
        std::mem::take(&mut self.items)
    }
}
