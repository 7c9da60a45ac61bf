//! # Metrics
//!
//! Prometheus export for routing, dispatch and queue activity.
//!
//! **Counters:**
//! - `tether_decisions_total{location, rationale}` - Routing decisions
//! - `tether_dispatch_total{location, outcome}` - Dispatch attempts
//! - `tether_drains_total{result}` - Drain passes by how they ended
//! - `tether_entries_failed_total` - Entries removed as permanently failed
//! - `tether_reachability_signals_total` - Debounced "became reachable" signals
//!
//! **Histograms:**
//! - `tether_dispatch_duration_seconds{location}` - Attempt duration
//!
//! **Gauges:**
//! - `tether_queue_depth` - Entries waiting in the delivery queue

pub mod handler;

pub use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Metric names.
pub mod names {
    pub const DECISIONS_TOTAL: &str = "tether_decisions_total";
    pub const DISPATCH_TOTAL: &str = "tether_dispatch_total";
    pub const DISPATCH_DURATION_SECONDS: &str = "tether_dispatch_duration_seconds";
    pub const QUEUE_DEPTH: &str = "tether_queue_depth";
    pub const DRAINS_TOTAL: &str = "tether_drains_total";
    pub const ENTRIES_FAILED_TOTAL: &str = "tether_entries_failed_total";
    pub const REACHABILITY_SIGNALS_TOTAL: &str = "tether_reachability_signals_total";
}

/// Install the global Prometheus recorder.
///
/// Duration buckets (seconds) cover on-device replies through slow remote
/// generations: [0.05, 0.1, 0.25, 0.5, 1, 2.5, 5, 10, 30, 60, 120].
pub fn setup_metrics() -> Result<PrometheusHandle, Box<dyn std::error::Error>> {
    use metrics_exporter_prometheus::Matcher;

    let duration_buckets = &[
        0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0,
    ];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(names::DISPATCH_DURATION_SECONDS.to_string()),
            duration_buckets,
        )?
        .install_recorder()?;

    Ok(handle)
}

/// Handle to the global recorder, or a detached one if a recorder is
/// already installed (tests build many app states in one process).
pub fn handle_or_detached() -> PrometheusHandle {
    setup_metrics().unwrap_or_else(|e| {
        tracing::debug!("Metrics already initialized, creating new handle: {}", e);
        PrometheusBuilder::new().build_recorder().handle()
    })
}
