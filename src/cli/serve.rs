//! Serve command implementation

use crate::agent::{Executor, HttpExecutor};
use crate::api::{create_router, AppState};
use crate::cli::ServeArgs;
use crate::config::{DispatchConfig, LogFormat, QueueBackendKind, QueueConfig, TetherConfig};
use crate::connectivity::{ConnectivityMonitor, HttpProbe, ProbeLoop};
use crate::dispatch::Dispatcher;
use crate::queue::{
    DeliveryQueueStore, JsonFileBackend, MemoryBackend, PersistenceBackend, QueueError,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Load configuration with CLI overrides
pub fn load_config_with_overrides(
    args: &ServeArgs,
) -> Result<TetherConfig, Box<dyn std::error::Error>> {
    // Load from file if it exists, otherwise use defaults
    let mut config = if args.config.exists() {
        TetherConfig::load(Some(&args.config))?
    } else {
        tracing::debug!("Config file not found, using defaults");
        TetherConfig::default()
    };

    // Apply environment variable overrides
    config = config.with_env_overrides();

    // Apply CLI overrides (highest priority)
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }
    if let Some(ref log_level) = args.log_level {
        config.logging.level = log_level.clone();
    }
    if let Some(ref path) = args.queue_path {
        config.queue.path = path.clone();
    }
    if args.offline {
        config.connectivity.initially_reachable = false;
    }

    Ok(config)
}

/// Initialize tracing based on configuration
pub fn init_tracing(
    config: &crate::config::LoggingConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter_str = crate::logging::build_filter_directives(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    if config.enable_content_logging {
        eprintln!("WARNING: Content logging is enabled. Prompt previews will be logged.");
        eprintln!("         This may include sensitive data. Use only for debugging.");
    }

    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
    }

    Ok(())
}

/// Open the delivery queue on the configured backend, recovering persisted entries
pub async fn open_store(config: &QueueConfig) -> Result<DeliveryQueueStore, QueueError> {
    let backend: Arc<dyn PersistenceBackend> = match config.backend {
        QueueBackendKind::File => {
            tracing::info!(path = %config.path.display(), "Using file-backed delivery queue");
            Arc::new(JsonFileBackend::new(&config.path))
        }
        QueueBackendKind::Memory => {
            tracing::warn!("Using in-memory delivery queue; entries are lost on restart");
            Arc::new(MemoryBackend::new())
        }
    };
    DeliveryQueueStore::open(backend, config.max_entries).await
}

/// Build the dispatcher with one pooled HTTP client shared by both executors
pub fn build_dispatcher(config: &DispatchConfig) -> Result<Dispatcher, Box<dyn std::error::Error>> {
    let client = Arc::new(
        Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?,
    );

    let local: Arc<dyn Executor> = Arc::new(HttpExecutor::new(
        "local",
        &config.local_endpoint,
        Arc::clone(&client),
    ));
    let server: Arc<dyn Executor> =
        Arc::new(HttpExecutor::new("server", &config.server_endpoint, client));

    Ok(Dispatcher::new(local, server, config.attempt_timeout()))
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }

    cancel_token.cancel();
}

/// Main serve command handler
pub async fn run_serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load and merge configuration
    let config = load_config_with_overrides(&args)?;
    config.validate()?;

    // 2. Initialize tracing
    init_tracing(&config.logging)?;

    tracing::info!("Starting Tether server");
    tracing::debug!(?config, "Loaded configuration");

    let prometheus = crate::metrics::setup_metrics()?;

    // 3. Open the queue before accepting submissions
    let store = Arc::new(open_store(&config.queue).await?);
    let dispatcher = Arc::new(build_dispatcher(&config.dispatch)?);

    // 4. Connectivity monitor and optional probe
    let monitor = ConnectivityMonitor::new(
        config.connectivity.initially_reachable,
        config.connectivity.debounce(),
    );

    let cancel_token = CancellationToken::new();
    let probe_handle = match &config.connectivity.probe_url {
        Some(url) => {
            tracing::info!(url = %url, "Starting reachability probe");
            let probe = HttpProbe::new(
                url.clone(),
                Client::new(),
                Duration::from_secs(config.connectivity.probe_timeout_seconds),
            );
            let probe_loop = ProbeLoop::new(
                Arc::new(probe),
                Arc::clone(&monitor),
                Duration::from_secs(config.connectivity.probe_interval_seconds),
            );
            Some(probe_loop.start(cancel_token.clone()))
        }
        None => {
            tracing::info!("Reachability probe disabled; use POST /v1/connectivity");
            None
        }
    };

    // 5. Build API state and start the queue processor
    let config = Arc::new(config);
    let app_state = Arc::new(
        AppState::new(Arc::clone(&config), dispatcher, store, monitor).with_prometheus(prometheus),
    );
    let processor_handle = Arc::clone(&app_state.processor).start(cancel_token.clone());
    let app = create_router(app_state);

    // 6. Bind and serve
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(addr = %addr, "Tether API server listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token.clone()))
        .await?;

    // 7. Cleanup
    cancel_token.cancel();
    if let Some(handle) = probe_handle {
        tracing::info!("Waiting for reachability probe to stop");
        handle.await?;
    }
    tracing::info!("Waiting for queue processor to stop");
    processor_handle.await?;

    tracing::info!("Tether server stopped");
    Ok(())
}
