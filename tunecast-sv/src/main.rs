//! Tunecast station (tunecast-sv) - Main entry point
//!
//! Loads configuration, starts the station, serves the control and stream
//! endpoints, and shuts everything down on Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt};

use tunecast_sv::api::{self, AppContext};
use tunecast_sv::config::{log_filter, Args, ServiceConfig, DEFAULT_LOG_LEVEL};
use tunecast_sv::{Station, StationOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Tracing goes up before configuration loads so its messages are kept.
    // The TOML log level is applied afterwards unless RUST_LOG is set.
    let initial_level = args.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL);
    let (filter, filter_handle) = reload::Layer::new(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| log_filter(initial_level).into()),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig::load(&args).context("Failed to load configuration")?;
    if std::env::var_os("RUST_LOG").is_none() && config.log_level != initial_level {
        filter_handle
            .reload(tracing_subscriber::EnvFilter::new(log_filter(&config.log_level)))
            .context("Failed to apply configured log level")?;
    }

    // Build identification first, before anything can stall
    info!(
        "Starting tunecast station (tunecast-sv) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Root folder: {}", config.root_folder.display());
    info!(
        "Stream format: {} Hz, {} channels, {} bit, {} byte frames",
        config.format.sample_rate,
        config.format.channels,
        config.format.bits_per_sample,
        config.format.frame_bytes()
    );

    let station =
        Station::launch(StationOptions::from(&config)).context("Failed to start station")?;

    let ctx = AppContext {
        controller: station.controller.clone(),
        events: station.events.clone(),
        client_queue_frames: config.client_queue_frames,
    };

    let served = api::server::run(&config.bind_addr(), ctx, shutdown_signal()).await;

    station.shutdown().await;
    served.context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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
