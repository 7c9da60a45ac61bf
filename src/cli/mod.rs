//! CLI module for Tether
//!
//! Command-line interface definitions and handlers.
//!
//! # Commands
//!
//! - `serve` - Start the gateway and queue processor
//! - `route` - Show the routing decision for a request
//! - `queue list` - Print the persisted delivery queue
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Start server with default config
//! tether serve
//!
//! # Where would this run while offline?
//! tether route --model llamba-1b --prompt "hello" --offline
//!
//! # Generate shell completions
//! tether completions bash > ~/.bash_completion.d/tether
//! ```

pub mod completions;
pub mod config;
pub mod output;
pub mod queue;
pub mod route;
pub mod serve;

pub use completions::handle_completions;
pub use config::handle_config_init;

use crate::routing::RoutingHint;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Tether - edge/server inference routing with an offline delivery queue
#[derive(Parser, Debug)]
#[command(
    name = "tether",
    version,
    about = "Edge/server inference routing with a durable offline delivery queue"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the Tether server
    Serve(ServeArgs),
    /// Show where a request would execute
    Route(RouteArgs),
    /// Inspect the delivery queue
    #[command(subcommand)]
    Queue(QueueCommands),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "tether.toml")]
    pub config: PathBuf,

    /// Override server port
    #[arg(short, long, env = "TETHER_PORT")]
    pub port: Option<u16>,

    /// Override server host
    #[arg(short = 'H', long, env = "TETHER_HOST")]
    pub host: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "TETHER_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Override the queue file location
    #[arg(long, env = "TETHER_QUEUE_PATH")]
    pub queue_path: Option<PathBuf>,

    /// Start assuming the network is unreachable
    #[arg(long)]
    pub offline: bool,
}

#[derive(Args, Debug)]
pub struct RouteArgs {
    /// Model identifier
    #[arg(short, long)]
    pub model: String,

    /// Prompt text
    #[arg(long)]
    pub prompt: String,

    /// Routing hint (automatic, local, server)
    #[arg(long, default_value = "automatic")]
    pub hint: RoutingHint,

    /// Network round trip estimate in milliseconds
    #[arg(long, default_value_t = 0)]
    pub rtt: u64,

    /// Treat the network as unreachable
    #[arg(long)]
    pub offline: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Path to configuration file
    #[arg(short, long, default_value = "tether.toml")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum QueueCommands {
    /// List persisted entries, oldest first
    List(QueueListArgs),
}

#[derive(Args, Debug)]
pub struct QueueListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Queue file (defaults to `queue.path` from the configuration)
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, default_value = "tether.toml")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "tether.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
