// [libs/shared/telemetry/src/init.rs]
//! Process-wide `tracing` subscriber setup: compact output for local
//! runs, flattened JSON for the container logs the platform scrapes.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber. Panics if a subscriber is already
/// installed, since that indicates a second `FlameSdk` in the same
/// process — forbidden by spec.md §9's "exactly one façade per
/// process."
pub fn init_tracing(service_name: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if cfg!(debug_assertions) { "debug" } else { "info" };
        format!("{service_name}={level},reqwest=warn,hyper=warn").into()
    });

    let is_production = !cfg!(debug_assertions);

    if is_production {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().flatten_event(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(false))
            .init();
    }
}
