//! Run state of the tick loop.

use serde::{Deserialize, Serialize};

/// Whether the tick loop is currently scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimState {
    /// Ticking on the configured interval
    Running,
    /// Not ticking; the herd keeps its last positions
    Stopped,
}

impl SimState {
    pub fn is_running(self) -> bool {
        self == SimState::Running
    }
}

impl std::fmt::Display for SimState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimState::Running => write!(f, "running"),
            SimState::Stopped => write!(f, "stopped"),
        }
    }
}
