//! Gateway binary: load configuration, compile routes, serve.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_gateway::config::{load_config, resolve_config_path};
use api_gateway::lifecycle::{shutdown, Shutdown};
use api_gateway::observability::metrics;
use api_gateway::{ExtensionRegistry, Gateway};

#[derive(Parser)]
#[command(name = "api-gateway", about = "Configuration-driven API gateway")]
struct Args {
    /// Path to the gateway configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Logging comes up before the config loads so loader warnings (duplicate
    // modules, discovery issues) are not dropped; the level is refined once
    // the configuration is known. RUST_LOG always wins.
    let default_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "api_gateway=info,tower_http=warn".into());
    let (filter, filter_handle) = tracing_subscriber::reload::Layer::new(default_filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = resolve_config_path(args.config);
    let config = load_config(&config_path)?;

    if std::env::var("RUST_LOG").is_err() {
        let refined = tracing_subscriber::EnvFilter::new(format!(
            "api_gateway={},tower_http=warn",
            config.observability.log_level
        ));
        if let Err(e) = filter_handle.reload(refined) {
            tracing::warn!(error = %e, "Failed to apply configured log level");
        }
    }

    tracing::info!(
        config = %config_path.display(),
        modules = config.modules.len(),
        bind_address = %config.listener.bind_address,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Extensions are loaded by the embedder; the stock binary ships none.
    // Registered extensions initialize once, before any request is served.
    let registry = ExtensionRegistry::new();
    registry.init_all().await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let coordinator = Shutdown::new();
    let server_shutdown = coordinator.subscribe();

    tokio::spawn(async move {
        shutdown::signal_received().await;
        coordinator.trigger();
    });

    let gateway = Gateway::new(config, &registry)?;
    gateway.run(listener, server_shutdown).await?;

    // Close hooks run once, after the server has drained.
    registry.close_all().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
