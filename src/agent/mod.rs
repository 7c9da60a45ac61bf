//! Executor abstraction layer.
//!
//! The inference runtime itself is an external collaborator. This module
//! defines the uniform "run this request, return a result or an error"
//! capability both locations are reached through.

use async_trait::async_trait;

pub mod error;
pub mod http;
pub mod types;

pub use error::ExecutorError;
pub use http::HttpExecutor;
pub use types::{ExecutionRequest, ExecutionResult};

use crate::request::Request;

/// Uniform interface for local and remote inference.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn Executor>`.
///
/// # Cancellation Safety
///
/// `execute` must be cancellation-safe: the dispatcher drops the future when
/// the per-attempt timeout elapses.
#[async_trait]
pub trait Executor: Send + Sync + 'static {
    /// Human-readable name for logging (e.g. "local", "server").
    fn name(&self) -> &str;

    /// Endpoint recorded with queued entries.
    fn endpoint(&self) -> &str;

    /// Execute one attempt of the request.
    ///
    /// # Returns
    ///
    /// - `Ok(ExecutionResult)` on success
    /// - `Err(ExecutorError::Upstream)` if the executor returned an error status
    /// - `Err(ExecutorError::Network)` if it could not be reached
    /// - `Err(ExecutorError::InvalidResponse)` if the response was malformed
    async fn execute(&self, request: &Request) -> Result<ExecutionResult, ExecutorError>;
}
