//! Queue command handlers

use crate::cli::output::{format_queue_json, format_queue_table};
use crate::cli::QueueListArgs;
use crate::config::TetherConfig;
use crate::queue::{JsonFileBackend, PersistenceBackend};

/// Handle `tether queue list` command
///
/// Reads the queue file directly; the server does not need to be running.
pub async fn handle_queue_list(
    args: &QueueListArgs,
) -> Result<String, Box<dyn std::error::Error>> {
    // Same precedence as `serve`: --path, then TETHER_QUEUE_PATH, then the file
    let path = match &args.path {
        Some(path) => path.clone(),
        None => {
            let config = if args.config.exists() {
                TetherConfig::load(Some(&args.config))?
            } else {
                TetherConfig::default()
            };
            config.with_env_overrides().queue.path
        }
    };

    let entries = JsonFileBackend::new(path).load().await?;

    if args.json {
        Ok(format_queue_json(&entries)?)
    } else if entries.is_empty() {
        Ok("Delivery queue is empty".to_string())
    } else {
        Ok(format_queue_table(&entries))
    }
}
