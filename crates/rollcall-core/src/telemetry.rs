//! Logging setup.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,rollcall=debug";

/// Install the global `tracing` subscriber.
///
/// Honours `RUST_LOG`, falling back to [`DEFAULT_FILTER`]. Returns `false`
/// if a subscriber was already installed (the existing one is kept).
pub fn init_tracing() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .is_ok()
}
