//! Log output for applications embedding Stash.
//!
//! Every Stash crate emits `tracing` events; with no subscriber installed
//! they go nowhere. Applications that don't already configure `tracing`
//! can call [`init`] once at startup.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` is used (e.g.
/// `"info"` or `"stash_manager=debug,info"`).
///
/// # Errors
/// Fails if a global subscriber is already installed.
pub fn init(default_filter: &str) -> Result<(), TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
}
