//! The downloader, its middleware chain, and shared HTTP session
//! construction.

pub mod downloader;
pub mod middleware;
pub mod session;

pub use downloader::Downloader;
pub use middleware::Middleware;
