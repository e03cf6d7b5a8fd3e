//! Shared application state for the admin server.

use std::sync::Arc;
use std::time::Instant;

use crate::simulation::Simulator;
use crate::upstream::RanchClient;

/// Application state shared between all handlers
pub struct AppState {
    /// Simulator handle; owns the engine and the tick loop
    pub simulator: Arc<Simulator<RanchClient>>,
    /// When the service came up, for the health report
    pub started_at: Instant,
}

impl AppState {
    pub fn new(simulator: Arc<Simulator<RanchClient>>) -> Self {
        Self {
            simulator,
            started_at: Instant::now(),
        }
    }

    /// Base URL of the ranch backend the herd is pushed to
    pub fn backend_url(&self) -> &str {
        self.simulator.sink().base_url()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
