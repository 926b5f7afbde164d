//! Tracing subscriber setup
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! embedding application's call. These helpers cover the common cases.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize human-readable log output.
///
/// `RUST_LOG` overrides the default filter when set.
pub fn init_tracing(verbose: bool) {
    let env_filter = if verbose {
        "ledgerlink=debug,info"
    } else {
        "ledgerlink=info,warn,error"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// JSON log output for machine ingestion
pub fn init_tracing_json() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledgerlink=info,warn,error".into()),
        )
        .with(tracing_subscriber::fmt::layer().json().with_target(true))
        .init();
}
