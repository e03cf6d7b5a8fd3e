//! Herd simulation engine - owns the herd and runs ticks.

use chrono::{DateTime, Duration, Utc};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, HerdConfig, HerdConfigPatch};
use crate::geo::GeoPoint;
use crate::herd::{generate_herd, Animal, CattleIdentity, CattleRegistry, Pasture};
use crate::movement::{step_herd, MoveOutcome};
use crate::stats::HerdStats;
use crate::strays::{altitude, ClassifierOutput, StrayAlert, StrayTracker};

/// Seconds a fence breach stays reported after the last animal outside
pub const FENCE_BREACH_HOLD_SECS: i64 = 120;

/// One animal as pushed to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HerdRecord {
    #[serde(flatten)]
    pub identity: CattleIdentity,
    pub lat: f64,
    pub lon: f64,
    pub altitude: i64,
    pub is_stray: bool,
    /// Whole minutes since the animal left the herd
    pub stray_duration: i64,
    /// Degrees from the herd centroid, four decimals
    pub distance_from_herd: f64,
}

/// Body of the herd ingestion push.
///
/// The ranch backend stores named records from `cattle`; `herd` carries
/// the same records for consumers that read that key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HerdPayload {
    pub herd: Vec<HerdRecord>,
    pub cattle: Vec<HerdRecord>,
    pub positions: Vec<GeoPoint>,
    pub config: HerdConfig,
    pub timestamp: DateTime<Utc>,
}

/// Result of a reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetSummary {
    pub cattle_count: usize,
    pub stray_count: usize,
}

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub movement: MoveOutcome,
    pub active_strays: usize,
}

/// The herd simulation.
///
/// Holds every piece of mutable simulation state: the herd, the stray
/// tracker, the fence-breach latch and the seeded RNG. Time is always
/// passed in, so ticks are reproducible for a given seed and clock.
pub struct HerdEngine {
    config: HerdConfig,
    pasture: Pasture,
    registry: CattleRegistry,

    herd: Vec<Animal>,
    tracker: StrayTracker,

    // Last tick's derived view
    stats: HerdStats,
    alerts: Vec<StrayAlert>,
    records: Vec<HerdRecord>,

    tick: u64,
    breach_until: Option<DateTime<Utc>>,

    // Random number generator (seeded for reproducibility)
    rng: ChaCha8Rng,
    seed: u64,
}

impl HerdEngine {
    /// Create an engine with a random seed and an initial herd
    pub fn new(config: HerdConfig, pasture: Pasture, registry: CattleRegistry) -> Self {
        let seed = rand::thread_rng().gen();
        Self::new_with_seed(config, pasture, registry, seed)
    }

    /// Create an engine with a specific seed for reproducibility
    pub fn new_with_seed(
        config: HerdConfig,
        pasture: Pasture,
        registry: CattleRegistry,
        seed: u64,
    ) -> Self {
        let mut engine = Self {
            config,
            pasture,
            registry,
            herd: Vec::new(),
            tracker: StrayTracker::new(),
            stats: HerdStats::new(),
            alerts: Vec::new(),
            records: Vec::new(),
            tick: 0,
            breach_until: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        };
        engine.reset(Utc::now());
        engine
    }

    /// Regenerate the whole herd from the current config and pasture.
    ///
    /// Clears stray tracking and the fence-breach latch, then classifies
    /// the new herd so animals anchored away from it are tracked from `now`.
    pub fn reset(&mut self, now: DateTime<Utc>) -> ResetSummary {
        self.herd = generate_herd(&self.config, &self.pasture, &self.registry, &mut self.rng);
        self.tracker.clear();
        self.breach_until = None;
        self.tick = 0;

        let view = self
            .tracker
            .classify(&self.herd, &self.config, self.pasture.center, now);
        self.refresh_view(view, now);

        let summary = ResetSummary {
            cattle_count: self.herd.len(),
            stray_count: self.herd.iter().filter(|a| a.is_designated_stray).count(),
        };
        log::info!(
            "Herd reset: {} cattle ({} designated strays)",
            summary.cattle_count,
            summary.stray_count
        );
        summary
    }

    /// Move the herd, classify strays and rebuild the derived view
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let movement = step_herd(&mut self.herd, &self.config, &self.pasture, &mut self.rng);
        if movement.outside_fence > 0 {
            log::debug!("{} cattle outside the fence", movement.outside_fence);
            self.breach_until = Some(now + Duration::seconds(FENCE_BREACH_HOLD_SECS));
        }

        let classified = self
            .tracker
            .classify(&self.herd, &self.config, self.pasture.center, now);
        self.tick += 1;
        self.refresh_view(classified, now);

        TickReport {
            tick: self.tick,
            movement,
            active_strays: self.tracker.len(),
        }
    }

    /// Run several ticks, spacing simulated time by `interval`
    pub fn run(&mut self, ticks: u64, start: DateTime<Utc>, interval: Duration) {
        let mut now = start;
        for _ in 0..ticks {
            self.tick(now);
            now += interval;
        }
    }

    fn refresh_view(&mut self, classified: ClassifierOutput, now: DateTime<Utc>) {
        let center = self.pasture.center;
        let mut records = Vec::with_capacity(self.herd.len());
        for (animal, class) in self.herd.iter().zip(&classified.classifications) {
            let stray_duration = self
                .tracker
                .get(animal.id())
                .map(|entry| (now - entry.detected_at).num_minutes().max(0))
                .unwrap_or(0);
            let jitter = self.rng.gen_range(-20.0..20.0);
            records.push(HerdRecord {
                identity: animal.identity.clone(),
                lat: animal.position.lat,
                lon: animal.position.lon,
                altitude: altitude(&animal.position, center) + jitter as i64,
                is_stray: class.is_stray,
                stray_duration,
                distance_from_herd: (class.distance_from_center * 10_000.0).round() / 10_000.0,
            });
        }

        self.records = records;
        self.alerts = classified.alerts;
        self.stats.tick = self.tick;
        self.stats
            .update(&self.herd, self.alerts.len(), self.fence_breach_active(now));
    }

    /// Apply a partial config update. Anchors stay where they are until the
    /// next reset.
    pub fn apply_config(&mut self, patch: &HerdConfigPatch) -> Result<&HerdConfig, ConfigError> {
        let next = self.config.merged(patch)?;
        self.config = next;
        log::info!("Herd configuration updated: {:?}", self.config);
        Ok(&self.config)
    }

    /// Swap the pasture (boundary reload). Takes effect for movement
    /// immediately and for anchors at the next reset.
    pub fn set_pasture(&mut self, pasture: Pasture) {
        self.pasture = pasture;
    }

    /// Backend push body for the current state
    pub fn payload(&self, now: DateTime<Utc>) -> HerdPayload {
        HerdPayload {
            herd: self.records.clone(),
            cattle: self.records.clone(),
            positions: self.herd.iter().map(|a| a.position).collect(),
            config: self.config.clone(),
            timestamp: now,
        }
    }

    /// Stats with the breach flag evaluated at `now`
    pub fn stats_at(&self, now: DateTime<Utc>) -> HerdStats {
        let mut stats = self.stats.clone();
        stats.fence_breach_active = self.fence_breach_active(now);
        stats
    }

    pub fn fence_breach_active(&self, now: DateTime<Utc>) -> bool {
        self.breach_until.map_or(false, |until| now < until)
    }

    pub fn config(&self) -> &HerdConfig {
        &self.config
    }

    pub fn pasture(&self) -> &Pasture {
        &self.pasture
    }

    pub fn herd(&self) -> &[Animal] {
        &self.herd
    }

    /// Direct access to the animals, for placing them by hand
    pub fn herd_mut(&mut self) -> &mut [Animal] {
        &mut self.herd
    }

    pub fn tracker(&self) -> &StrayTracker {
        &self.tracker
    }

    pub fn stats(&self) -> &HerdStats {
        &self.stats
    }

    pub fn alerts(&self) -> &[StrayAlert] {
        &self.alerts
    }

    pub fn records(&self) -> &[HerdRecord] {
        &self.records
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Get seed for reproducibility
    pub fn seed(&self) -> u64 {
        self.seed
    }
}
