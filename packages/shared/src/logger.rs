//! Logging setup utilities for the Chatrelay workspace.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose log output is enabled at the default level.
const WORKSPACE_TARGETS: [&str; 3] = ["chatrelay_server", "chatrelay_shared", "tower_http"];

/// Build the default filter directive for the given binary and level.
///
/// ```
/// use chatrelay_shared::logger::default_filter;
///
/// let filter = default_filter("chatrelay-server", "info");
/// assert!(filter.contains("chatrelay_server=info"));
/// ```
pub fn default_filter(binary_name: &str, default_log_level: &str) -> String {
    WORKSPACE_TARGETS
        .iter()
        .copied()
        .chain(std::iter::once(binary_name))
        .map(|target| format!("{}={}", target.replace('-', "_"), default_log_level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize the tracing subscriber with the specified default log level.
///
/// The log level can be overridden using the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "chatrelay-server")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
