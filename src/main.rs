//! Eye Runner - eye-tracking driven runner controller
//!
//! Two halves, both optional:
//! - Game host: a UDP receive thread latches eye samples, a fixed-rate frame
//!   loop feeds them to the character motion controller
//! - Relay: browser trackers connect over WebSocket and each eye-data
//!   message is forwarded to the game as one UDP datagram

mod app;
mod config;
mod game;
mod http;
mod input;
mod net;
mod util;
mod ws;

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::AppState;
use crate::config::Config;
use crate::game::{GameHost, SharedStatus};
use crate::http::build_router;
use crate::util::time::init_process_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    init_process_time();

    info!("Starting Eye Runner");

    if !config.game_enabled && !config.relay_enabled {
        warn!("Both GAME_ENABLED and RELAY_ENABLED are off, nothing to do");
        return Ok(());
    }

    let status: SharedStatus = Arc::new(RwLock::new(None));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = Vec::new();

    if config.game_enabled {
        info!(addr = %config.receiver_addr, "Game host listening for eye data");
        let host = GameHost::start(&config, status.clone());
        tasks.push(tokio::spawn(host.run(shutdown_rx.clone())));
    }

    if config.relay_enabled {
        let addr = config.relay_addr;
        let state = AppState::new(config.clone(), status.clone()).await?;
        let router = build_router(state);
        let listener = TcpListener::bind(addr).await?;

        info!("Relay listening on {}", addr);
        info!("Forwarding eye data to udp://{}", config.udp_target);
        info!("WebSocket endpoint: ws://{}/ws", addr);

        let mut relay_shutdown = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move {
            let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
                while !*relay_shutdown.borrow_and_update() {
                    if relay_shutdown.changed().await.is_err() {
                        break;
                    }
                }
            });
            if let Err(e) = serve.await {
                error!(error = %e, "Relay server error");
            }
        }));
    }

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    for task in tasks {
        if let Err(e) = task.await {
            error!(error = %e, "Task failed during shutdown");
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
