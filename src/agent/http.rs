//! HTTP executor.
//!
//! Both the on-device runtime and the remote inference service are reached
//! through the same JSON-over-HTTP contract, so one implementation serves
//! both locations with a different endpoint.

use super::types::{ExecutionErrorBody, ExecutionRequest, ExecutionResult};
use super::{Executor, ExecutorError};
use crate::request::Request;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;

/// Executor that POSTs the request to a fixed endpoint.
pub struct HttpExecutor {
    /// Human-readable name for logs
    name: String,
    /// Full URL, e.g. "http://127.0.0.1:8000/generate"
    endpoint: String,
    /// Shared HTTP client for connection pooling
    client: Arc<Client>,
}

impl HttpExecutor {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, client: Arc<Client>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            client,
        }
    }

    fn map_send_error(e: reqwest::Error) -> ExecutorError {
        if e.is_timeout() {
            // Client-side timeout; the elapsed time is not reported by reqwest
            ExecutorError::Network(format!("request timed out: {}", e))
        } else if e.is_builder() {
            ExecutorError::InvalidRequest(e.to_string())
        } else {
            ExecutorError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn execute(&self, request: &Request) -> Result<ExecutionResult, ExecutorError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-request-id", &request.id)
            .json(&ExecutionRequest::from(request))
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ExecutorError::InvalidResponse(format!("Failed to read response body: {}", e))
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<ExecutionErrorBody>(&body)
                .map(|b| b.message())
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("error").to_string());
            return Err(ExecutorError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str::<ExecutionResult>(&body).map_err(|e| {
            ExecutorError::InvalidResponse(format!("Failed to parse executor response: {}", e))
        })
    }
}
