// src/state.rs
use std::sync::Arc;

use crate::config::RelayConfig;
use crate::services::relay::UpstreamClient;

pub type SharedState = Arc<AppState>;

/// Read-only per-process state. Nothing here changes between requests.
pub struct AppState {
    pub config: RelayConfig,
    pub upstream: UpstreamClient,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Self {
        let upstream = UpstreamClient::new(&config);
        Self { config, upstream }
    }

    pub fn shared(config: RelayConfig) -> SharedState {
        Arc::new(Self::new(config))
    }
}
