//! # herdsim
//!
//! Synthetic cattle herd simulator for ranch monitoring dashboards.
//!
//! ## Features
//!
//! - **Anchored motion**: every animal drifts around its own home point
//! - **Herd cohesion**: the main herd holds together, designated strays wander
//! - **Fence aware**: animals are pushed back from the pasture boundary
//! - **Stray alerts**: away-from-herd detection with durations and nearest cow
//! - **Reproducible**: seeded random number generation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chrono::{Duration, Utc};
//! use herdsim::{CattleRegistry, HerdConfig, HerdEngine, Pasture};
//!
//! let mut engine = HerdEngine::new(HerdConfig::default(), Pasture::default(), CattleRegistry::default());
//!
//! // One hour of simulated ticks
//! engine.run(720, Utc::now(), Duration::seconds(5));
//!
//! println!("{}", engine.stats().summary());
//! for alert in engine.alerts() {
//!     println!("{} away for {}", alert.name, alert.duration);
//! }
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use herdsim::Config;
//!
//! let mut config = Config::default();
//! config.herd.total_cattle_count = 120;
//! config.herd.stray_percentage = 5.0;
//! assert!(config.validate().is_ok());
//! ```

pub mod config;
pub mod engine;
pub mod geo;
pub mod herd;
pub mod movement;
pub mod simulation;
pub mod stats;
pub mod strays;
pub mod upstream;
pub mod web;

// Re-export main types
pub use config::{Config, ConfigError, HerdConfig, HerdConfigPatch};
pub use engine::{HerdEngine, HerdPayload, HerdRecord};
pub use geo::{FencePolygon, GeoPoint};
pub use herd::{Animal, CattleIdentity, CattleRegistry, Pasture};
pub use stats::HerdStats;
pub use strays::StrayAlert;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a quick benchmark
pub fn benchmark(ticks: u64, cattle: usize) -> BenchmarkResult {
    use std::time::Instant;

    let config = HerdConfig {
        total_cattle_count: cattle,
        ..HerdConfig::default()
    };
    let mut engine = HerdEngine::new(config, Pasture::default(), CattleRegistry::default());

    let start = Instant::now();
    engine.run(ticks, chrono::Utc::now(), chrono::Duration::seconds(5));
    let elapsed = start.elapsed();

    BenchmarkResult {
        ticks,
        cattle: engine.herd().len(),
        active_strays: engine.alerts().len(),
        elapsed_secs: elapsed.as_secs_f64(),
        ticks_per_second: ticks as f64 / elapsed.as_secs_f64(),
    }
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub ticks: u64,
    pub cattle: usize,
    pub active_strays: usize,
    pub elapsed_secs: f64,
    pub ticks_per_second: f64,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Ticks: {}", self.ticks)?;
        writeln!(f, "Cattle: {}", self.cattle)?;
        writeln!(f, "Away at end: {}", self.active_strays)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} ticks/s", self.ticks_per_second)?;
        Ok(())
    }
}
