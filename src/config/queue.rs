//! Delivery queue configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Where queue entries are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueueBackendKind {
    /// JSON file at `queue.path`
    #[default]
    File,
    /// Process memory, lost on exit
    Memory,
}

impl FromStr for QueueBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(QueueBackendKind::File),
            "memory" => Ok(QueueBackendKind::Memory),
            _ => Err(format!("Invalid queue backend: {}", s)),
        }
    }
}

/// Delivery queue settings
///
/// Both limits are unset by default: the queue is unbounded and entries are
/// retried on every trigger until they reach a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub path: PathBuf,
    pub backend: QueueBackendKind,
    /// Reject new entries once this many are queued
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,
    /// Remove an entry after this many attempts end in transient failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("tether-queue.json"),
            backend: QueueBackendKind::File,
            max_entries: None,
            max_attempts: None,
        }
    }
}
