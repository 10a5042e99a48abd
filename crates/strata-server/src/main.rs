//! # Strata Scheduler Server
//!
//! Entry point of the deadline-aware job scheduler: wires the Kafka intake,
//! the scheduling core, and the configured job trigger, then runs the
//! single-threaded consume loop until interrupted.

use strata_config::{AppConfig, Experiment};
use strata_core::StrataResult;
use tokio::signal;
use tracing::{error, info, warn};

mod app;

#[tokio::main]
async fn main() {
    init_logging();

    warn!("ReStart Scheduler Process");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run().await {
        error!("Application error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> StrataResult<()> {
    let config = AppConfig::load()?;

    let experiment = Experiment::from_config(&config);
    info!(exp_id = %experiment.exp_id, "Experiment configuration");

    app::run(config, shutdown_signal()).await
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,strata=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}
