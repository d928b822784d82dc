//! mentor-api - Feedback-driven learning strategy service
//!
//! Receives student feedback over HTTP, classifies it, stores it through the
//! Dapr PostgreSQL binding, and returns the resulting strategy update.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use mentor_common::config::{ConfigOverrides, ServiceConfig};
use mentor_common::db::{BindingGateway, DaprHttpBinding, SqlGateway};
use mentor_common::CallContext;
use mentor_api::feedback::{FeedbackPipeline, GatewayFeedbackRepository};
use mentor_api::strategy::KeywordClassifier;
use mentor_api::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for mentor-api
///
/// Every option falls back to the environment, then the config file, then
/// compiled defaults.
#[derive(Parser, Debug)]
#[command(name = "mentor-api")]
#[command(about = "Feedback-driven learning strategy service")]
#[command(version)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Dapr sidecar host
    #[arg(long)]
    dapr_host: Option<String>,

    /// Dapr sidecar HTTP port
    #[arg(long)]
    dapr_http_port: Option<u16>,

    /// Name of the PostgreSQL output binding
    #[arg(long)]
    binding_name: Option<String>,

    /// Per-request deadline in milliseconds
    #[arg(long)]
    request_timeout_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_file: self.config.clone(),
            port: self.port,
            dapr_host: self.dapr_host.clone(),
            dapr_http_port: self.dapr_http_port,
            binding_name: self.binding_name.clone(),
            request_timeout_ms: self.request_timeout_ms,
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config =
        ServiceConfig::resolve(&args.overrides()).context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("mentor_api={0},mentor_common={0},tower_http={0}", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting mentor-api v{} on port {}",
        env!("CARGO_PKG_VERSION"),
        config.port
    );

    let binding = DaprHttpBinding::new(
        &config.dapr_base_url(),
        &config.binding_name,
        config.request_timeout,
    )
    .context("Failed to create Dapr binding client")?;
    info!("Database binding: {}", binding.url());

    let gateway: Arc<dyn SqlGateway> = Arc::new(BindingGateway::new(Arc::new(binding)));
    let repository = Arc::new(GatewayFeedbackRepository::new(gateway.clone()));
    let classifier = Arc::new(KeywordClassifier::new());
    let pipeline = Arc::new(FeedbackPipeline::new(repository, classifier));

    // Not fatal: the sidecar often starts after the app; readiness reports it
    match gateway
        .ping(&CallContext::with_timeout(config.request_timeout))
        .await
    {
        Ok(()) => info!("✓ Database binding reachable"),
        Err(e) => warn!(error = %e, "Database binding not reachable yet"),
    }

    let state = AppState::new(pipeline, gateway, config.request_timeout);
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("mentor-api listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
