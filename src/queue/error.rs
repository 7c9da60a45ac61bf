//! Error types for the delivery queue.

use thiserror::Error;

/// Errors from queue store and persistence operations.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to (de)serialize queue: {0}")]
    Serialization(String),

    /// An entry with this id is already queued
    #[error("Entry '{0}' is already queued")]
    DuplicateId(String),

    /// Configured capacity reached
    #[error("Queue is full ({max_entries} entries)")]
    Full { max_entries: usize },
}

impl From<serde_json::Error> for QueueError {
    fn from(e: serde_json::Error) -> Self {
        QueueError::Serialization(e.to_string())
    }
}
