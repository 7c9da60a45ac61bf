//! Error types for executor operations.

use thiserror::Error;

/// Errors an executor can report for one attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// Connectivity error (DNS, connection refused, reset).
    #[error("Network error: {0}")]
    Network(String),

    /// Attempt exceeded its deadline.
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// Executor answered with a non-success status.
    #[error("Executor error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// The request cannot be executed as submitted.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Executor response doesn't match the expected format.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
