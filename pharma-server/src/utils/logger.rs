//! Logging Infrastructure

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber
///
/// `RUST_LOG` overrides the default filter.
pub fn init_logger() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pharma_server=info,tower_http=info".into()),
        )
        .with_target(false)
        .init();
}
