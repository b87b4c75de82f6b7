//! CLI entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use meridian::{Config, LoadBalancer};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Application-layer load balancer.
#[derive(Parser, Debug)]
#[command(name = "meridian", version, about)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(short, long, default_value = "meridian.toml")]
    config: PathBuf,

    /// Override the serving port from the config file.
    #[arg(long)]
    serving_port: Option<u16>,

    /// Override the scrape port from the config file.
    #[arg(long)]
    scrape_port: Option<u16>,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let mut config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = ?e, path = %cli.config.display(), "failed to load configuration");
            return ExitCode::FAILURE;
        },
    };

    if let Some(port) = cli.serving_port {
        config.serving_port = port;
    }
    if let Some(port) = cli.scrape_port {
        config.scrape_port = port;
    }

    let load_balancer = match LoadBalancer::new(config) {
        Ok(lb) => lb,
        Err(e) => {
            tracing::error!(error = ?e, "failed to initialize load balancer");
            return ExitCode::FAILURE;
        },
    };

    tokio::select! {
        result = load_balancer.serve() => {
            if let Err(e) = result {
                tracing::error!(error = ?e, "load balancer exited with an error");
                return ExitCode::FAILURE;
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    ExitCode::SUCCESS
}
