//! LibreRace server: transport wiring around the core engine.
//!
//! The binary in `main.rs` loads configuration, builds the engine, and
//! accepts TCP connections; everything per-connection lives in
//! [`session`].

pub mod session;

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{debug, info};

use librerace_core::engine::RaceEngine;

/// Accept connections forever, one session task each.
///
/// Session errors are per-connection noise (clients disconnect however
/// they like) and never propagate out of the accept loop.
pub async fn serve(engine: Arc<RaceEngine>, listener: TcpListener) -> anyhow::Result<()> {
    let local_addr = listener.local_addr().context("listener has no address")?;
    info!(%local_addr, "accepting connections");

    loop {
        let (stream, peer) = listener.accept().await.context("accept failed")?;
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            debug!(%peer, "connection opened");
            if let Err(err) = session::handle_connection(engine, stream).await {
                debug!(%peer, %err, "session ended with error");
            }
            debug!(%peer, "connection closed");
        });
    }
}
