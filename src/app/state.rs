//! Application state shared across routes

use std::sync::atomic::{AtomicU64, AtomicUsize};
use std::sync::Arc;

use crate::config::Config;
use crate::game::SharedStatus;
use crate::net::{ForwardError, UdpForwarder};

/// Relay counters
#[derive(Debug, Default)]
pub struct RelayStats {
    pub active_connections: AtomicUsize,
    /// Messages dropped for any reason (parse, rate limit, send)
    pub dropped_messages: AtomicU64,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub forwarder: Arc<UdpForwarder>,
    pub relay_stats: Arc<RelayStats>,
    /// `None` inside when the game host is disabled or stopped
    pub player_status: SharedStatus,
}

impl AppState {
    pub async fn new(config: Config, player_status: SharedStatus) -> Result<Self, ForwardError> {
        let config = Arc::new(config);

        // One outbound socket shared by all relay sessions
        let forwarder = Arc::new(UdpForwarder::bind(config.udp_target).await?);

        Ok(Self {
            config,
            forwarder,
            relay_stats: Arc::new(RelayStats::default()),
            player_status,
        })
    }
}
