//! Logging setup. Kept deliberately thin: the core only needs a sane
//! default subscriber so `tracing` calls elsewhere in the crate go
//! somewhere; CLI-level log configuration is out of scope.

use anyhow::Error;

/// Initialize structured logging using `RUST_LOG`, falling back to
/// `info` crate-wide and `debug` for this crate.
pub fn init_logging() -> Result<(), Error> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,feedsearch_crawler=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .ok();

    Ok(())
}

/// Initialize logging at an explicit level, overriding `RUST_LOG`.
pub fn init_logging_with_level(level: &str) -> Result<(), Error> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = format!("{level},feedsearch_crawler={level}");

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .ok();

    Ok(())
}
