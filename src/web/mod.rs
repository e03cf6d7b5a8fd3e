//! Admin REST API for the herd simulator.
//!
//! A small axum surface for tuning and inspecting a running simulator:
//! config, reset, stats, health, the last tick's herd and stray alerts,
//! and start/stop of the tick loop.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use herdsim::{CattleRegistry, HerdConfig, HerdEngine, Pasture};
//! use herdsim::config::UpstreamConfig;
//! use herdsim::simulation::Simulator;
//! use herdsim::upstream::RanchClient;
//! use herdsim::web::{run_server, AppState};
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = HerdEngine::new(HerdConfig::default(), Pasture::default(), CattleRegistry::default());
//!     let client = RanchClient::new(&UpstreamConfig::default());
//!     let simulator = Arc::new(Simulator::new(engine, client, Duration::from_secs(5)));
//!     let state = Arc::new(AppState::new(simulator));
//!     run_server(state, "127.0.0.1:9100".parse().unwrap(), std::future::pending())
//!         .await
//!         .unwrap();
//! }
//! ```

mod routes;
mod server;
mod state;

pub use server::{router, run_server};
pub use state::AppState;
