//! Core data types: the queue item hierarchy (`Queueable`, `CallbackResult`),
//! `Request`/`RequestParts`, `Response`, and the tagged union a callback's
//! return value is modeled as (`Yielded`).

pub mod queueable;
pub mod request;
pub mod response;
pub mod yielded;

pub use queueable::{CallbackResult, Queueable};
pub use request::{Callback, FailureCallback, Method, Request, RequestParts};
pub use response::Response;
pub use yielded::Yielded;
