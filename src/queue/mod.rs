//! The priority work queue, grounded in
//! `original_source/.../crawler/queueable.py`'s `Queueable`/`CallbackResult`
//! ordering and the teacher's `queue::task_queue::TaskQueue` BinaryHeap
//! wrapper, generalized to a lower-priority-number-wins ordering and
//! `join()`/`task_done()` semantics.

mod priority_queue;

pub use priority_queue::{PriorityQueue, QueueStats};
