//! The tagged union a parse callback's return value becomes, replacing the
//! Python original's dynamic dispatch on whatever a coroutine/async
//! generator happened to yield (plain value, `Item`, `Request`, nested
//! generator). See spec §9's "Dynamic dispatch on callback return types".

use crate::core::request::Request;

/// Whatever a callback hands back to the crawler.
pub enum Yielded<I> {
    /// Follow this new request.
    Request(Request<I>),
    /// A finished result the caller wants to keep.
    Item(I),
    /// A nested batch, re-queued one level deeper so
    /// `max_callback_recursion` can bound runaway fan-out.
    Sub(Vec<Yielded<I>>),
}
