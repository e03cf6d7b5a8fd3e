//! Configuration system for the herd simulator.
//!
//! Supports YAML configuration files with sensible defaults. The `herd`
//! section holds the runtime tunables that the admin API can change.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Largest herd the simulator will generate
pub const MAX_CATTLE: usize = 500;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub herd: HerdConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Herd behaviour tunables.
///
/// Distances and radii are in degrees on the flat lat/lon plane used by
/// [`crate::geo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HerdConfig {
    /// Herd size when no cattle registry is loaded
    pub total_cattle_count: usize,
    /// Share of the herd pre-selected as strays (0 - 100)
    pub stray_percentage: f64,
    /// Anchor radius around the ranch centre for the main herd
    pub cluster_radius: f64,
    /// Anchor radius around the ranch centre for designated strays
    pub stray_radius: f64,
    /// Upper bound of the random-walk step per tick
    pub movement_speed: f64,
    /// Hard cap on displacement per tick
    pub movement_limit: f64,
    /// Distance from the herd centroid beyond which an animal is away
    pub stray_distance_threshold: f64,
    /// Weight of the push back from the fence (0 - 1)
    pub boundary_avoidance_strength: f64,
    /// Weight of the pull toward the main herd centroid (0 - 1)
    pub herd_cohesion: f64,
    /// Weight of the pull back toward each animal's anchor (0 - 1)
    pub anchor_pull: f64,
    /// Fraction of `herd_cohesion` applied to designated strays (0 - 1)
    pub stray_cohesion_factor: f64,
}

impl Default for HerdConfig {
    fn default() -> Self {
        Self {
            total_cattle_count: 50,
            stray_percentage: 10.0,
            cluster_radius: 0.01,
            stray_radius: 0.05,
            movement_speed: 0.00018,
            movement_limit: 0.0025,
            stray_distance_threshold: 0.01,
            boundary_avoidance_strength: 0.3,
            herd_cohesion: 0.1,
            anchor_pull: 0.05,
            stray_cohesion_factor: 0.25,
        }
    }
}

impl HerdConfig {
    /// Number of designated strays for a herd of `herd_size`
    pub fn designated_stray_count(&self, herd_size: usize) -> usize {
        let count = (herd_size as f64 * self.stray_percentage / 100.0).round();
        (count.max(0.0) as usize).min(herd_size)
    }

    /// Validate all tunables
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_cattle_count == 0 || self.total_cattle_count > MAX_CATTLE {
            return Err(invalid(format!(
                "totalCattleCount must be between 1 and {MAX_CATTLE}"
            )));
        }
        check_range("strayPercentage", self.stray_percentage, 0.0, 100.0)?;
        check_non_negative("clusterRadius", self.cluster_radius)?;
        check_non_negative("strayRadius", self.stray_radius)?;
        check_non_negative("movementSpeed", self.movement_speed)?;
        check_non_negative("movementLimit", self.movement_limit)?;
        check_non_negative("strayDistanceThreshold", self.stray_distance_threshold)?;
        check_range(
            "boundaryAvoidanceStrength",
            self.boundary_avoidance_strength,
            0.0,
            1.0,
        )?;
        check_range("herdCohesion", self.herd_cohesion, 0.0, 1.0)?;
        check_range("anchorPull", self.anchor_pull, 0.0, 1.0)?;
        check_range("strayCohesionFactor", self.stray_cohesion_factor, 0.0, 1.0)?;
        Ok(())
    }

    /// Merge a partial update over this config and validate the result.
    ///
    /// Nothing is applied unless every field of the merged config is valid.
    pub fn merged(&self, patch: &HerdConfigPatch) -> Result<HerdConfig, ConfigError> {
        let mut next = self.clone();

        if let Some(count) = patch.total_cattle_count {
            if !count.is_finite() || count.fract() != 0.0 || count < 1.0 || count > MAX_CATTLE as f64 {
                return Err(invalid(format!(
                    "totalCattleCount must be a whole number between 1 and {MAX_CATTLE}"
                )));
            }
            next.total_cattle_count = count as usize;
        }
        if let Some(v) = patch.stray_percentage {
            next.stray_percentage = v;
        }
        if let Some(v) = patch.cluster_radius {
            next.cluster_radius = v;
        }
        if let Some(v) = patch.stray_radius {
            next.stray_radius = v;
        }
        if let Some(v) = patch.movement_speed {
            next.movement_speed = v;
        }
        if let Some(v) = patch.movement_limit {
            next.movement_limit = v;
        }
        if let Some(v) = patch.stray_distance_threshold {
            next.stray_distance_threshold = v;
        }
        if let Some(v) = patch.boundary_avoidance_strength {
            next.boundary_avoidance_strength = v;
        }
        if let Some(v) = patch.herd_cohesion {
            next.herd_cohesion = v;
        }
        if let Some(v) = patch.anchor_pull {
            next.anchor_pull = v;
        }
        if let Some(v) = patch.stray_cohesion_factor {
            next.stray_cohesion_factor = v;
        }

        next.validate()?;
        Ok(next)
    }
}

/// Partial herd config, as accepted by the admin API and the backend.
///
/// The count is taken as a float so that negative or fractional values
/// reach validation and get a descriptive error instead of a decode
/// failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HerdConfigPatch {
    pub total_cattle_count: Option<f64>,
    pub stray_percentage: Option<f64>,
    pub cluster_radius: Option<f64>,
    pub stray_radius: Option<f64>,
    pub movement_speed: Option<f64>,
    pub movement_limit: Option<f64>,
    pub stray_distance_threshold: Option<f64>,
    pub boundary_avoidance_strength: Option<f64>,
    pub herd_cohesion: Option<f64>,
    pub anchor_pull: Option<f64>,
    pub stray_cohesion_factor: Option<f64>,
}

/// Tick loop and local data configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Milliseconds between ticks
    pub update_interval_ms: u64,
    /// Fixed RNG seed; random when absent
    pub seed: Option<u64>,
    /// JSON file with the cattle registry
    pub registry_path: Option<PathBuf>,
    /// Admin API bind address
    pub bind: String,
    /// Start ticking as soon as the service is up
    pub autostart: bool,
}

/// Ranch backend connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the ranch backend
    pub base_url: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
    /// Ticks between stats lines in the offline simulator
    pub stats_interval: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: 5000,
            seed: None,
            registry_path: None,
            bind: "127.0.0.1:9100".to_string(),
            autostart: true,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8082".to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            stats_interval: 10,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.herd.validate()?;
        if self.simulator.update_interval_ms == 0 {
            return Err(invalid("update_interval_ms must be > 0"));
        }
        if self.upstream.base_url.trim().is_empty() {
            return Err(invalid("upstream base_url must not be empty"));
        }
        if self.logging.stats_interval == 0 {
            return Err(invalid("stats_interval must be > 0"));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

fn check_non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(format!("{name} must be a finite number >= 0")));
    }
    Ok(())
}

fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < min || value > max {
        return Err(invalid(format!("{name} must be between {min} and {max}")));
    }
    Ok(())
}
