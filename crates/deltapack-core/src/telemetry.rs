//! Log output for the `deltapack` binary.
//!
//! Everything is written to stderr; stdout carries only the preview, the
//! summary and the confirmation prompt.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter taken from `RUST_LOG`, or `level` when the variable is unset or
/// unparsable.
fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Install the process-wide subscriber, as JSON lines when `json` is set.
///
/// Only the first call in a process installs anything.
pub fn init_tracing(json: bool, level: Level) {
    let text_layer = (!json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });
    let json_layer = json.then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
    });

    let _ = tracing_subscriber::registry()
        .with(level_filter(level))
        .with(text_layer)
        .with(json_layer)
        .try_init();
}
