//! Tracing subscriber setup for the binary.

use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::foundation::error::{ReelError, ReelResult};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "reelpin=info,axum=info";

/// Install a fmt subscriber filtered by `RUST_LOG` (or [`DEFAULT_FILTER`]).
pub fn init_tracing() -> ReelResult<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| ReelError::config(format!("failed to install tracing subscriber: {e}")))
}
