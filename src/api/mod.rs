//! # HTTP API
//!
//! HTTP surface of the submission gateway and delivery queue.
//!
//! ## Endpoints
//!
//! - `POST /v1/generate` - Submit a request; delivered now or queued
//! - `POST /v1/route` - Routing decision preview, without execution
//! - `GET /v1/models` - Capability catalog
//! - `GET /v1/models/:id` - Profile used for one model id
//! - `GET /v1/queue` - Queued entries, oldest first
//! - `POST /v1/queue/drain` - Manual drain trigger
//! - `GET|POST /v1/connectivity` - Read or report reachability
//! - `GET /health` - Reachability and queue status
//! - `GET /metrics` - Prometheus metrics
//!
//! ## Error Handling
//!
//! Errors use an OpenAI-style envelope:
//! ```json
//! {
//!   "error": {
//!     "message": "Invalid request: prompt cannot be empty",
//!     "type": "invalid_request_error",
//!     "code": "invalid_request_error"
//!   }
//! }
//! ```

mod connectivity;
pub mod error;
mod generate;
mod health;
mod models;
mod queue;
pub mod types;

pub use error::{ApiError, ApiErrorBody};
pub use types::*;

use crate::capability::CapabilityCatalog;
use crate::config::TetherConfig;
use crate::connectivity::{ConnectivityMonitor, ManualSource};
use crate::dispatch::Dispatcher;
use crate::gateway::Gateway;
use crate::metrics::PrometheusHandle;
use crate::processor::QueueProcessor;
use crate::queue::DeliveryQueueStore;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub config: Arc<TetherConfig>,
    pub catalog: Arc<CapabilityCatalog>,
    pub store: Arc<DeliveryQueueStore>,
    pub monitor: Arc<ConnectivityMonitor>,
    /// Source fed by `POST /v1/connectivity`
    pub manual: ManualSource,
    pub gateway: Arc<Gateway>,
    pub processor: Arc<QueueProcessor>,
    pub prometheus: PrometheusHandle,
    /// Server startup time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Wire the gateway and processor around an opened store.
    pub fn new(
        config: Arc<TetherConfig>,
        dispatcher: Arc<Dispatcher>,
        store: Arc<DeliveryQueueStore>,
        monitor: Arc<ConnectivityMonitor>,
    ) -> Self {
        let catalog = Arc::new(config.catalog());

        let gateway = Arc::new(
            Gateway::new(
                Arc::clone(&catalog),
                Arc::clone(&dispatcher),
                Arc::clone(&store),
                Arc::clone(&monitor),
            )
            .with_content_logging(config.logging.enable_content_logging),
        );

        let processor = Arc::new(
            QueueProcessor::new(
                Arc::clone(&store),
                dispatcher,
                Arc::clone(&catalog),
                Arc::clone(&monitor),
            )
            .with_max_attempts(config.queue.max_attempts),
        );

        Self {
            config,
            catalog,
            store,
            manual: ManualSource::new(Arc::clone(&monitor)),
            monitor,
            gateway,
            processor,
            prometheus: crate::metrics::handle_or_detached(),
            start_time: Instant::now(),
        }
    }

    /// Render `/metrics` from an already installed recorder.
    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = handle;
        self
    }
}

/// Create the main API router with all endpoints configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.server.request_body_limit_bytes;

    Router::new()
        .route("/v1/generate", post(generate::handle))
        .route("/v1/route", post(generate::preview))
        .route("/v1/models", get(models::list))
        .route("/v1/models/:id", get(models::get))
        .route("/v1/queue", get(queue::list))
        .route("/v1/queue/drain", post(queue::drain))
        .route(
            "/v1/connectivity",
            get(connectivity::get).post(connectivity::update),
        )
        .route("/health", get(health::handle))
        .route("/metrics", get(crate::metrics::handler::metrics_handler))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
