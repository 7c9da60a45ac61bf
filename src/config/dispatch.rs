//! Execution dispatch configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Executor endpoints and the per-attempt timeout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Fixed timeout for one attempt, in milliseconds
    pub attempt_timeout_ms: u64,
    /// On-device runtime endpoint
    pub local_endpoint: String,
    /// Remote inference service endpoint
    pub server_endpoint: String,
}

impl DispatchConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_ms: 30_000,
            local_endpoint: "http://127.0.0.1:11434/generate".to_string(),
            server_endpoint: "http://127.0.0.1:8000/generate".to_string(),
        }
    }
}
