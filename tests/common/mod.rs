//! Shared test utilities for Tether integration tests.
//!
//! Provides scripted executors and builders for requests, dispatchers and
//! routers to reduce duplication across test files.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tether::agent::{ExecutionResult, Executor, ExecutorError};
use tether::api::{create_router, AppState};
use tether::config::TetherConfig;
use tether::connectivity::ConnectivityMonitor;
use tether::dispatch::Dispatcher;
use tether::queue::{DeliveryQueueStore, QueueEntry};
use tether::request::{Payload, Request};
use tether::routing::RoutingHint;
use tether::telemetry::{Connectivity, TelemetrySnapshot};

// =============================================================================
// Executors
// =============================================================================

/// Executor that replays scripted outcomes and records every prompt it sees.
///
/// Once the script is exhausted every call succeeds with `ok:<prompt>`.
pub struct ScriptedExecutor {
    name: String,
    script: Mutex<VecDeque<Result<ExecutionResult, ExecutorError>>>,
    seen: Mutex<Vec<String>>,
    delay: Duration,
}

impl ScriptedExecutor {
    pub fn new(name: &str) -> Arc<Self> {
        Self::with_script(name, Vec::new())
    }

    pub fn with_script(
        name: &str,
        script: Vec<Result<ExecutionResult, ExecutorError>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        })
    }

    pub fn slow(name: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            script: Mutex::new(VecDeque::new()),
            seen: Mutex::new(Vec::new()),
            delay,
        })
    }

    /// Prompts in the order they were executed.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    fn endpoint(&self) -> &str {
        "scripted://"
    }

    async fn execute(&self, request: &Request) -> Result<ExecutionResult, ExecutorError> {
        self.seen
            .lock()
            .unwrap()
            .push(request.payload.prompt.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            Ok(ExecutionResult {
                result: format!("ok:{}", request.payload.prompt),
            })
        })
    }
}

pub fn network_error() -> Result<ExecutionResult, ExecutorError> {
    Err(ExecutorError::Network("connection refused".to_string()))
}

pub fn bad_request() -> Result<ExecutionResult, ExecutorError> {
    Err(ExecutorError::Upstream {
        status: 400,
        message: "unsupported model".to_string(),
    })
}

// =============================================================================
// Builders
// =============================================================================

pub fn dispatcher(local: Arc<ScriptedExecutor>, server: Arc<ScriptedExecutor>) -> Arc<Dispatcher> {
    Arc::new(Dispatcher::new(local, server, Duration::from_secs(5)))
}

pub fn request(prompt: &str, model: &str, hint: RoutingHint, reachable: bool) -> Request {
    Request::new(
        Payload::new(prompt),
        model,
        hint,
        TelemetrySnapshot::new(Connectivity::from_reachable(reachable), 0),
    )
}

/// Pending entry for a request submitted while offline.
pub fn offline_entry(prompt: &str, model: &str) -> QueueEntry {
    QueueEntry::new(request(prompt, model, RoutingHint::Automatic, false), "")
}

/// Everything a router test needs, with handles kept for assertions.
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub local: Arc<ScriptedExecutor>,
    pub server: Arc<ScriptedExecutor>,
}

pub async fn test_app(reachable: bool) -> TestApp {
    test_app_with(ScriptedExecutor::new("local"), ScriptedExecutor::new("server"), reachable).await
}

pub async fn test_app_with(
    local: Arc<ScriptedExecutor>,
    server: Arc<ScriptedExecutor>,
    reachable: bool,
) -> TestApp {
    let config = Arc::new(TetherConfig::default());
    let store = Arc::new(DeliveryQueueStore::in_memory().await);
    let monitor = ConnectivityMonitor::new(reachable, Duration::ZERO);
    let state = Arc::new(AppState::new(
        config,
        dispatcher(Arc::clone(&local), Arc::clone(&server)),
        store,
        monitor,
    ));
    TestApp {
        router: create_router(Arc::clone(&state)),
        state,
        local,
        server,
    }
}
