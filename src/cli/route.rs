//! Route command: show where a request would execute

use crate::cli::output::{format_route_json, format_route_table};
use crate::cli::RouteArgs;
use crate::config::TetherConfig;
use crate::gateway::RoutePreview;
use crate::request::Payload;
use crate::telemetry::{Connectivity, TelemetrySnapshot};

/// Compute the routing preview for the arguments against the configured catalog
pub fn preview_route(
    args: &RouteArgs,
    config: &TetherConfig,
) -> Result<RoutePreview, Box<dyn std::error::Error>> {
    Payload::new(args.prompt.as_str()).validate()?;

    let snapshot = TelemetrySnapshot::new(Connectivity::from_reachable(!args.offline), args.rtt);
    let catalog = config.catalog();
    Ok(RoutePreview::compute(
        &snapshot,
        args.hint,
        catalog.resolve(&args.model),
    ))
}

/// Handle `tether route` command
pub fn handle_route(args: &RouteArgs) -> Result<String, Box<dyn std::error::Error>> {
    let config = if args.config.exists() {
        TetherConfig::load(Some(&args.config))?
    } else {
        TetherConfig::default()
    };

    let preview = preview_route(args, &config)?;
    if args.json {
        Ok(format_route_json(&preview)?)
    } else {
        Ok(format_route_table(&preview))
    }
}
