//! Routing policy: choose where a request executes.
//!
//! [`decide`] is a pure function of its inputs. It reads no clock, no
//! randomness and no global state, so identical inputs always produce the
//! identical [`RoutingDecision`].
//!
//! # Policy
//!
//! 1. An explicit `local` or `server` hint is honored, except:
//!    - `local` for a model that cannot run locally falls back to `server`
//!      (`incompatible-fallback`)
//!    - `server` (including that fallback) while unreachable is `unresolved`
//! 2. `automatic` while unreachable runs locally if the model allows it,
//!    otherwise `unresolved`.
//! 3. `automatic` while reachable compares
//!    `server = base_server_latency + 2 * rtt` against the local estimate and
//!    takes the lower. A tie goes to `local`.

pub mod decision;

pub use decision::{Location, Rationale, RoutingDecision, RoutingHint};

use crate::capability::CapabilityProfile;
use crate::telemetry::{Connectivity, TelemetrySnapshot};
use serde::Serialize;

/// Latency estimates the policy compares, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LatencyEstimate {
    pub server_ms: u64,
    /// None when the model cannot run locally
    pub local_ms: Option<u64>,
}

impl LatencyEstimate {
    pub fn compute(snapshot: &TelemetrySnapshot, capability: &CapabilityProfile) -> Self {
        Self {
            server_ms: capability
                .server_latency_ms
                .saturating_add(snapshot.rtt().saturating_mul(2)),
            local_ms: capability.local_estimate(),
        }
    }

    /// Lower-latency location; ties prefer local.
    pub fn preferred(&self) -> Location {
        match self.local_ms {
            Some(local) if local <= self.server_ms => Location::Local,
            _ => Location::Server,
        }
    }
}

/// Decide where a request should execute.
pub fn decide(
    snapshot: &TelemetrySnapshot,
    hint: RoutingHint,
    capability: &CapabilityProfile,
) -> RoutingDecision {
    let reachable = snapshot.connectivity() == Connectivity::Reachable;

    match hint {
        RoutingHint::Local if capability.local_capable => {
            RoutingDecision::Local(Rationale::ExplicitHint)
        }
        RoutingHint::Local => {
            if reachable {
                RoutingDecision::Server(Rationale::IncompatibleFallback)
            } else {
                RoutingDecision::Unresolved
            }
        }
        RoutingHint::Server => {
            if reachable {
                RoutingDecision::Server(Rationale::ExplicitHint)
            } else {
                RoutingDecision::Unresolved
            }
        }
        RoutingHint::Automatic if !reachable => {
            if capability.local_capable {
                RoutingDecision::Local(Rationale::OfflineLocal)
            } else {
                RoutingDecision::Unresolved
            }
        }
        RoutingHint::Automatic => match LatencyEstimate::compute(snapshot, capability).preferred()
        {
            Location::Local => RoutingDecision::Local(Rationale::LatencyEstimate),
            Location::Server => RoutingDecision::Server(Rationale::LatencyEstimate),
        },
    }
}
