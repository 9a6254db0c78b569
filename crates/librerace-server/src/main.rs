//! LibreRace server binary
//!
//! Reads configuration once at startup, loads the track (fatal if that
//! fails), starts the tick loop, and serves connections until killed.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use librerace_core::config::ServerConfig;
use librerace_core::engine::RaceEngine;
use librerace_core::track::TrackGeometry;
use librerace_server::serve;

/// Authoritative race simulation server
#[derive(Debug, Parser)]
#[command(name = "librerace-server", version)]
struct Args {
    /// Path to the JSON config file; defaults apply when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address
    #[arg(long)]
    listen: Option<String>,

    /// Override the track sample CSV path
    #[arg(long)]
    track: Option<PathBuf>,

    /// Override the number of cars on the grid
    #[arg(long)]
    cars: Option<usize>,

    /// Override the tick rate in Hz
    #[arg(long)]
    tick_rate: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    if let Some(track) = args.track {
        config.track_path = track;
    }
    if let Some(cars) = args.cars {
        config.car_count = cars;
    }
    if let Some(tick_rate) = args.tick_rate {
        config.tick_rate_hz = tick_rate;
    }
    config.validate().context("invalid configuration")?;

    // The track is a hard startup dependency: no geometry, no server.
    let track = TrackGeometry::load_csv(&config.track_path, &config.track_id, &config.track_name)
        .with_context(|| format!("loading track from {}", config.track_path.display()))?;
    info!(
        track = %track.name,
        points = track.len(),
        "track loaded"
    );

    let engine = Arc::new(RaceEngine::new(&config, track));
    engine.log_tokens().await;
    Arc::clone(&engine).spawn_tick_loop();

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    info!(addr = %config.listen_addr, cars = config.car_count, "race server up");

    serve(engine, listener).await
}
