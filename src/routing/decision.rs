//! Routing decision types

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Caller-supplied routing override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoutingHint {
    #[default]
    Automatic,
    Local,
    Server,
}

impl FromStr for RoutingHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "automatic" | "auto" => Ok(RoutingHint::Automatic),
            "local" => Ok(RoutingHint::Local),
            "server" => Ok(RoutingHint::Server),
            _ => Err(format!("Invalid routing hint: {}", s)),
        }
    }
}

/// Where a request executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Local,
    Server,
}

impl Location {
    pub fn as_str(self) -> &'static str {
        match self {
            Location::Local => "local",
            Location::Server => "server",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a location was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rationale {
    /// The caller's hint was honored
    ExplicitHint,
    /// Lower estimated latency
    LatencyEstimate,
    /// `local` was requested for a model that cannot run locally
    IncompatibleFallback,
    /// Network unreachable, model runs locally
    OfflineLocal,
    /// No location can be chosen now
    Unresolved,
}

impl Rationale {
    pub fn as_str(self) -> &'static str {
        match self {
            Rationale::ExplicitHint => "explicit-hint",
            Rationale::LatencyEstimate => "latency-estimate",
            Rationale::IncompatibleFallback => "incompatible-fallback",
            Rationale::OfflineLocal => "offline-local",
            Rationale::Unresolved => "unresolved",
        }
    }
}

impl fmt::Display for Rationale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the routing policy.
///
/// `Unresolved` is a valid outcome meaning "cannot choose now": the caller
/// enqueues instead of executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutingDecision {
    Local(Rationale),
    Server(Rationale),
    Unresolved,
}

impl RoutingDecision {
    pub fn location(&self) -> Option<Location> {
        match self {
            RoutingDecision::Local(_) => Some(Location::Local),
            RoutingDecision::Server(_) => Some(Location::Server),
            RoutingDecision::Unresolved => None,
        }
    }

    pub fn rationale(&self) -> Rationale {
        match self {
            RoutingDecision::Local(r) | RoutingDecision::Server(r) => *r,
            RoutingDecision::Unresolved => Rationale::Unresolved,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, RoutingDecision::Unresolved)
    }

    /// Label used for logs and metrics: `local`, `server` or `unresolved`.
    pub fn label(&self) -> &'static str {
        self.location().map_or("unresolved", Location::as_str)
    }
}

#[derive(Serialize)]
struct DecisionWire {
    decision: &'static str,
    rationale: Rationale,
}

impl Serialize for RoutingDecision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DecisionWire {
            decision: self.label(),
            rationale: self.rationale(),
        }
        .serialize(serializer)
    }
}
