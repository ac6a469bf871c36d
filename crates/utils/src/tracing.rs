//! Tracing initialization for stashkv
//!
//! Library crates only emit events through the `tracing` macros; wiring a
//! subscriber is left to the embedding application via this helper.

use stashkv_core::constants::STASHKV_LOG_VAR;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, trace, warn};

/// Initialize the tracing system
///
/// Reads the filter from `STASHKV_LOG` (falling back to "info") and installs
/// a compact stderr formatter. Returns an error if a global subscriber is
/// already set.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_env(STASHKV_LOG_VAR).unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .compact()
        .with_target(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
