//! Submission path errors.

use crate::agent::ExecutorError;
use crate::queue::QueueError;
use crate::routing::Location;
use thiserror::Error;

/// Why a submission was neither delivered nor queued.
///
/// Transient execution failures never appear here: they end in a queued
/// response instead.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed payload, rejected before routing
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The chosen location rejected the request permanently
    #[error("Request rejected by {location} executor: {error}")]
    Rejected {
        location: Location,
        error: ExecutorError,
    },

    /// The request could not be persisted
    #[error("Failed to enqueue request: {0}")]
    Queue(#[from] QueueError),
}
