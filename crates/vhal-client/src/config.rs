//! Client configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use vhal_core::{ClientError, ClientResult};

/// Tunables for one client instance.
///
/// The response timeout is the only externally meaningful knob; it is
/// owned per instance so independent clients (and tests) do not interfere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Bounded wait for a correlated get/set result, in milliseconds
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
    /// Interval of the stale-entry sweeper, in milliseconds
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

fn default_response_timeout_ms() -> u64 {
    10_000
}

fn default_sweep_interval_ms() -> u64 {
    5_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: default_response_timeout_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

impl ClientConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// Parse a TOML fragment, filling unspecified fields with defaults.
    pub fn from_toml_str(raw: &str) -> ClientResult<Self> {
        toml::from_str(raw).map_err(|e| ClientError::InvalidRequest(format!("bad config: {e}")))
    }
}
