//! Connectivity monitor configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reachability observation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// Minimum quiet interval between two "became reachable" signals
    pub debounce_ms: u64,
    /// URL polled for reachability; no probing when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_url: Option<String>,
    pub probe_interval_seconds: u64,
    pub probe_timeout_seconds: u64,
    /// State assumed before the first observation
    pub initially_reachable: bool,
}

impl ConnectivityConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 2000,
            probe_url: None,
            probe_interval_seconds: 10,
            probe_timeout_seconds: 3,
            initially_reachable: true,
        }
    }
}
