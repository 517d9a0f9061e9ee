//! PDBP CLI - Main entry point

mod bootstrap;
mod cli;

use bootstrap::Platform;
use clap::Parser;
use cli::{Args, Command};
use pdbp_api::AppState;
use pdbp_core::DiscoveryScanner;
use pdbp_foundation::PlatformConfig;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = PlatformConfig::load(args.config.as_deref())?;
    args.apply_overrides(&mut config);
    config.validate()?;

    // Initialize logging (RUST_LOG 우선)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match args.command {
        Some(Command::Discover { dir }) => discover(&config, dir),
        Some(Command::Serve) | None => serve(config).await,
    }
}

async fn serve(config: PlatformConfig) -> anyhow::Result<()> {
    let platform = Platform::build(&config)?;
    let events = platform.watch_events();
    platform.restore().await;

    let state = AppState::new(platform.service.clone());
    pdbp_api::serve(&config.server, state, shutdown_signal()).await?;

    let stopped = platform.lifecycle.shutdown().await;
    if stopped > 0 {
        tracing::info!("Stopped {} running plugins", stopped);
    }
    drop(platform);
    events.abort();
    Ok(())
}

fn discover(config: &PlatformConfig, dir: Option<PathBuf>) -> anyhow::Result<()> {
    let directory = dir.unwrap_or_else(|| config.plugins.directory.clone());
    let scanner = DiscoveryScanner::new(&directory, &config.plugins.artifact_patterns)?;
    let report = scanner.discover();

    println!("{}", serde_json::to_string_pretty(&report.descriptors)?);
    eprintln!(
        "{} artifacts found, {} skipped in {}",
        report.descriptors.len(),
        report.skipped,
        directory.display()
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
