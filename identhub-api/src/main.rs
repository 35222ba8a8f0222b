use anyhow::Result;
use clap::Parser;
use identhub_api::{router, AppState};
use identhub_core::config::Config;
use identhub_core::logging::init_logging_with_config;
use identhub_core::metrics::init_metrics;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

/// identhub REST server
#[derive(Parser, Debug)]
#[command(name = "identhub-api", version, about)]
struct Args {
    /// Configuration file; environment variables are used when absent
    #[arg(short, long, env = "IDENTHUB_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured bind address
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Override the configured log level
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,

    /// Password sealing the server identity in the keystore
    #[arg(long, env = "IDENTHUB_KEYSTORE_PASSWORD", hide_env_values = true)]
    keystore_password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            let mut config = Config::from_file(path)?;
            config.apply_env()?;
            config
        }
        None => Config::from_env()?,
    };
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
    config.validate()?;

    init_logging_with_config(config.log_config())?;
    init_metrics();

    let addr = config.server.bind_address;
    let state = AppState::bootstrap(config, args.keystore_password.as_deref()).await?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "identhub API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("identhub API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
