//! Output formatting helpers for CLI commands

use crate::gateway::RoutePreview;
use crate::queue::{EntryStatus, QueueEntry};
use crate::routing::RoutingDecision;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde_json::json;

const PROMPT_COLUMN_CHARS: usize = 40;

/// Format queue entries as a table, oldest first
pub fn format_queue_table(entries: &[QueueEntry]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "#", "Entry", "Model", "Hint", "Status", "Attempts", "Enqueued", "Prompt",
    ]);

    for (i, e) in entries.iter().enumerate() {
        let status_str = match e.status {
            EntryStatus::Pending => "Pending".yellow().to_string(),
            EntryStatus::InFlight => "In flight".cyan().to_string(),
            EntryStatus::Delivered => "Delivered".green().to_string(),
            EntryStatus::Failed => "Failed".red().to_string(),
        };

        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(e.id()),
            Cell::new(&e.request.model_id),
            Cell::new(format!("{:?}", e.request.hint).to_lowercase()),
            Cell::new(status_str),
            Cell::new(e.attempts),
            Cell::new(e.enqueued_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(shorten(&e.request.payload.prompt, PROMPT_COLUMN_CHARS)),
        ]);
    }

    table.to_string()
}

/// Format queue entries as JSON
pub fn format_queue_json(entries: &[QueueEntry]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&json!({
        "depth": entries.len(),
        "entries": entries,
    }))
}

/// Format a routing preview as a two-column table
pub fn format_route_table(preview: &RoutePreview) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field", "Value"]);

    let known = if preview.model.known {
        "catalog"
    } else {
        "default profile"
    };
    let local = preview
        .estimate
        .local_ms
        .map_or_else(|| "n/a".to_string(), |ms| format!("{}ms", ms));

    table.add_row(vec![
        Cell::new("Decision"),
        Cell::new(decision_label(&preview.decision)),
    ]);
    table.add_row(vec![
        Cell::new("Rationale"),
        Cell::new(preview.decision.rationale()),
    ]);
    table.add_row(vec![
        Cell::new("Model"),
        Cell::new(format!("{} ({})", preview.model.id, known)),
    ]);
    table.add_row(vec![
        Cell::new("Local capable"),
        Cell::new(preview.model.profile.local_capable),
    ]);
    table.add_row(vec![Cell::new("Local estimate"), Cell::new(local)]);
    table.add_row(vec![
        Cell::new("Server estimate"),
        Cell::new(format!("{}ms", preview.estimate.server_ms)),
    ]);
    table.add_row(vec![
        Cell::new("Connectivity"),
        Cell::new(format!("{:?}", preview.connectivity)),
    ]);

    table.to_string()
}

/// Format a routing preview as JSON
pub fn format_route_json(preview: &RoutePreview) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(preview)
}

/// Colored decision label
pub fn decision_label(decision: &RoutingDecision) -> String {
    match decision {
        RoutingDecision::Local(_) => "local".green().to_string(),
        RoutingDecision::Server(_) => "server".blue().to_string(),
        RoutingDecision::Unresolved => "unresolved (queue)".yellow().to_string(),
    }
}

fn shorten(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some((idx, _)) => format!("{}…", &s[..idx]),
    }
}
