//! `BinaryHeap`-backed priority queue: lowest `priority()` value pops
//! first, ties broken by enqueue order (FIFO), satisfying Testable
//! Property 2 even when two entries land in the same tick.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Notify};

use crate::core::queueable::Queueable;

struct QueueEntry<T> {
    priority: i32,
    seq: u64,
    enqueued_at: Instant,
    item: T,
}

impl<T> PartialEq for QueueEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl<T> Eq for QueueEntry<T> {}

impl<T> PartialOrd for QueueEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for QueueEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; invert priority so the lowest number
        // (highest precedence) sorts greatest, and invert seq so the
        // earliest-enqueued entry at an equal priority also sorts greatest.
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A dequeued item plus how long it waited on the queue.
pub struct Dequeued<T> {
    pub item: T,
    pub wait_time: Duration,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QueueStats {
    pub len: usize,
    pub in_flight: usize,
}

/// An async priority queue with `join()`/`task_done()` semantics matching
/// Python's `asyncio.PriorityQueue` usage in the crawler's worker loop:
/// `join()` resolves once every item that was ever `put` has had a matching
/// `task_done`.
pub struct PriorityQueue<T: Queueable> {
    heap: Mutex<BinaryHeap<QueueEntry<T>>>,
    not_empty: Notify,
    in_flight: AtomicUsize,
    idle: Notify,
    seq: AtomicU64,
}

impl<T: Queueable> PriorityQueue<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            heap: Mutex::new(BinaryHeap::new()),
            not_empty: Notify::new(),
            in_flight: AtomicUsize::new(0),
            idle: Notify::new(),
            seq: AtomicU64::new(0),
        })
    }

    pub async fn put(&self, item: T) {
        let priority = item.priority();
        let seq = self.seq.fetch_add(1, AtomicOrdering::Relaxed);
        let entry = QueueEntry {
            priority,
            seq,
            enqueued_at: Instant::now(),
            item,
        };
        self.in_flight.fetch_add(1, AtomicOrdering::SeqCst);
        self.heap.lock().await.push(entry);
        self.not_empty.notify_one();
    }

    /// Blocks until an item is available, then pops the highest-precedence
    /// one (lowest `priority()`, oldest enqueue time as tiebreak).
    pub async fn get(&self) -> Dequeued<T> {
        loop {
            {
                let mut heap = self.heap.lock().await;
                if let Some(entry) = heap.pop() {
                    return Dequeued {
                        item: entry.item,
                        wait_time: entry.enqueued_at.elapsed(),
                    };
                }
            }
            self.not_empty.notified().await;
        }
    }

    /// Marks one previously-`put` item as finished, per the orchestrator's
    /// worker loop. `join()` resolves once `in_flight` returns to zero.
    pub fn task_done(&self) {
        let previous = self.in_flight.fetch_sub(1, AtomicOrdering::SeqCst);
        if previous == 1 {
            self.idle.notify_waiters();
        }
    }

    /// Resolves once every `put` item has a matching `task_done` AND the
    /// heap is empty (a `put` racing with the last `task_done` is the
    /// reason for the loop rather than a single `notified().await`).
    pub async fn join(&self) {
        loop {
            if self.in_flight.load(AtomicOrdering::SeqCst) == 0 {
                return;
            }
            self.idle.notified().await;
        }
    }

    /// Drains the heap and resets `in_flight`, waking any `join()` waiters.
    /// Used on total-timeout/cancellation teardown.
    pub async fn clear(&self) {
        self.heap.lock().await.clear();
        self.in_flight.store(0, AtomicOrdering::SeqCst);
        self.idle.notify_waiters();
    }

    pub async fn stats(&self) -> QueueStats {
        QueueStats {
            len: self.heap.lock().await.len(),
            in_flight: self.in_flight.load(AtomicOrdering::SeqCst),
        }
    }

    pub async fn len(&self) -> usize {
        self.heap.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::queueable::Queueable;

    struct Item(i32, &'static str);

    impl Queueable for Item {
        fn priority(&self) -> i32 {
            self.0
        }
    }

    #[tokio::test]
    async fn lower_priority_number_pops_first() {
        let queue = PriorityQueue::new();
        queue.put(Item(100, "low")).await;
        queue.put(Item(1, "high")).await;
        let first = queue.get().await;
        assert_eq!(first.item.1, "high");
    }

    #[tokio::test]
    async fn equal_priority_pops_in_fifo_order() {
        let queue = PriorityQueue::new();
        queue.put(Item(5, "a")).await;
        queue.put(Item(5, "b")).await;
        queue.put(Item(5, "c")).await;
        assert_eq!(queue.get().await.item.1, "a");
        assert_eq!(queue.get().await.item.1, "b");
        assert_eq!(queue.get().await.item.1, "c");
    }

    #[tokio::test]
    async fn join_resolves_after_all_task_done_calls() {
        let queue = PriorityQueue::new();
        queue.put(Item(1, "a")).await;
        queue.put(Item(1, "b")).await;

        let dequeued_a = queue.get().await;
        let dequeued_b = queue.get().await;

        let queue_clone = Arc::clone(&queue);
        let join_handle = tokio::spawn(async move { queue_clone.join().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!join_handle.is_finished());

        queue.task_done();
        drop(dequeued_a);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!join_handle.is_finished());

        queue.task_done();
        drop(dequeued_b);
        join_handle.await.unwrap();
    }

    #[tokio::test]
    async fn clear_drops_pending_items_and_unblocks_join() {
        let queue = PriorityQueue::new();
        queue.put(Item(1, "a")).await;
        queue.put(Item(1, "b")).await;
        let _ = queue.get().await;

        queue.clear().await;
        assert_eq!(queue.len().await, 0);
        queue.join().await;
    }
}
