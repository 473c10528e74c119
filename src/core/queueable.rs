//! `Queueable`: anything schedulable on the priority queue. A `Request` and
//! a `CallbackResult` are both `Queueable` — only their priority differs.

use crate::core::yielded::Yielded;

/// Default priority for a freshly constructed `Request` (lower is sooner).
pub const DEFAULT_REQUEST_PRIORITY: i32 = 100;

/// `CallbackResult` priority is fixed above the default so callback fanout
/// drains ahead of new fetches, which keeps the queue from growing without
/// bound when a page yields many follow-up requests.
pub const CALLBACK_RESULT_PRIORITY: i32 = 1;

/// Trait implemented by anything that can sit on the `PriorityQueue`.
pub trait Queueable {
    fn priority(&self) -> i32;
}

/// A deferred callback return value, re-queued so its fan-out is processed
/// ahead of brand-new `Request`s.
pub struct CallbackResult<I> {
    pub value: Yielded<I>,
    pub callback_recursion: u32,
}

impl<I> CallbackResult<I> {
    pub fn new(value: Yielded<I>, callback_recursion: u32) -> Self {
        Self {
            value,
            callback_recursion,
        }
    }
}

impl<I> Queueable for CallbackResult<I> {
    fn priority(&self) -> i32 {
        CALLBACK_RESULT_PRIORITY
    }
}
