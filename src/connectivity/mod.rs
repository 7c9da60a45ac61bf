//! Connectivity monitor.
//!
//! Holds the current reachability and publishes a debounced "became
//! reachable" signal. Raw observations come from injectable sources: a
//! [`ManualSource`] driven by API calls or CLI flags, and an optional
//! [`probe::ProbeLoop`] that polls a reachability probe.
//!
//! Debounce: at least `debounce` must elapse between two consecutive
//! signals. A transition to reachable inside the quiet interval is not
//! dropped; one deferred signal fires when the interval ends if the network
//! is still reachable then.

pub mod probe;

pub use probe::{HttpProbe, ProbeLoop, ReachabilityProbe};

use crate::metrics::names;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;

const SIGNAL_CHANNEL_CAPACITY: usize = 16;

/// Emitted when the network transitions to reachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReachabilitySignal {
    /// Source whose observation caused the signal
    pub source: String,
    /// Whether the signal was held back by the debounce interval
    pub deferred: bool,
}

#[derive(Debug, Default)]
struct DebounceState {
    last_signal: Option<Instant>,
    deferred_pending: bool,
}

/// Observes reachability transitions.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    state: watch::Sender<bool>,
    signals: broadcast::Sender<ReachabilitySignal>,
    debounce: Duration,
    debounce_state: Mutex<DebounceState>,
}

impl ConnectivityMonitor {
    pub fn new(initially_reachable: bool, debounce: Duration) -> Arc<Self> {
        let (state, _) = watch::channel(initially_reachable);
        let (signals, _) = broadcast::channel(SIGNAL_CHANNEL_CAPACITY);
        Arc::new(Self {
            state,
            signals,
            debounce,
            debounce_state: Mutex::new(DebounceState::default()),
        })
    }

    pub fn is_reachable(&self) -> bool {
        *self.state.borrow()
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Stream of debounced "became reachable" signals.
    pub fn subscribe(&self) -> broadcast::Receiver<ReachabilitySignal> {
        self.signals.subscribe()
    }

    /// Watch the raw reachability state.
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    /// Record an observation from `source`.
    ///
    /// Only an unreachable to reachable transition can produce a signal.
    pub fn observe(self: &Arc<Self>, reachable: bool, source: &str) {
        let previous = self.state.send_replace(reachable);
        if previous == reachable {
            return;
        }

        tracing::info!(reachable, source, "Connectivity changed");
        if !reachable {
            return;
        }

        let now = Instant::now();
        let mut state = match self.debounce_state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        match state.last_signal {
            Some(last) if now.duration_since(last) < self.debounce => {
                if state.deferred_pending {
                    return;
                }
                state.deferred_pending = true;
                let fire_at = last + self.debounce;
                let monitor = Arc::clone(self);
                let source = source.to_string();
                tracing::debug!(
                    source = %source,
                    delay_ms = fire_at.duration_since(now).as_millis() as u64,
                    "Reachability signal deferred by debounce"
                );
                tokio::spawn(async move {
                    tokio::time::sleep_until(fire_at).await;
                    monitor.fire_deferred(source);
                });
            }
            _ => {
                state.last_signal = Some(now);
                drop(state);
                self.emit(ReachabilitySignal {
                    source: source.to_string(),
                    deferred: false,
                });
            }
        }
    }

    fn fire_deferred(&self, source: String) {
        let mut state = match self.debounce_state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.deferred_pending = false;
        if !self.is_reachable() {
            tracing::debug!(source = %source, "Deferred reachability signal dropped, offline again");
            return;
        }
        state.last_signal = Some(Instant::now());
        drop(state);
        self.emit(ReachabilitySignal {
            source,
            deferred: true,
        });
    }

    fn emit(&self, signal: ReachabilitySignal) {
        metrics::counter!(names::REACHABILITY_SIGNALS_TOTAL).increment(1);
        tracing::debug!(source = %signal.source, deferred = signal.deferred, "Became reachable");
        // No subscribers is fine; the processor may not be running yet
        let _ = self.signals.send(signal);
    }
}

/// Source driven by explicit calls, such as `POST /v1/connectivity`.
#[derive(Debug, Clone)]
pub struct ManualSource {
    monitor: Arc<ConnectivityMonitor>,
}

impl ManualSource {
    pub const NAME: &'static str = "manual";

    pub fn new(monitor: Arc<ConnectivityMonitor>) -> Self {
        Self { monitor }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.monitor.observe(reachable, Self::NAME);
    }
}
