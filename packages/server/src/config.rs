//! Engine policy configuration.

use std::time::Duration;

/// Policy constants read by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum message length in characters
    pub max_message_length: usize,
    /// How long a typing-start stays active without a refresh or stop
    pub typing_ttl: Duration,
    /// Upper bound for one authentication call
    pub auth_timeout: Duration,
    /// Upper bound for one durable store call
    pub store_timeout: Duration,
    /// Interval of the background typing expiry sweep
    pub typing_sweep_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_message_length: 2_000,
            typing_ttl: Duration::from_secs(5),
            auth_timeout: Duration::from_secs(5),
            store_timeout: Duration::from_secs(5),
            typing_sweep_interval: Duration::from_secs(1),
        }
    }
}
