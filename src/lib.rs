//! Tether - edge/server inference routing with an offline delivery queue
//!
//! This library decides, per request, whether inference runs on the device or
//! on a remote server, and holds requests that cannot be delivered yet in a
//! durable, order-preserving queue that drains when the network comes back.

pub mod agent;
pub mod api;
pub mod capability;
pub mod cli;
pub mod config;
pub mod connectivity;
pub mod dispatch;
pub mod gateway;
pub mod logging;
pub mod metrics;
pub mod processor;
pub mod queue;
pub mod request;
pub mod routing;
pub mod telemetry;
