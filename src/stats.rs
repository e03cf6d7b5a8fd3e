//! Statistics tracking for the herd.

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;
use crate::herd::Animal;

/// Statistics snapshot for a simulation tick
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HerdStats {
    /// Ticks since the last reset
    pub tick: u64,
    /// Number of animals in the herd
    pub total_cattle: usize,
    /// Animals not designated as strays
    pub main_herd_count: usize,
    /// Animals designated as strays at reset
    pub designated_stray_count: usize,
    /// Animals currently away from the herd
    pub active_stray_alerts: usize,
    /// Mean distance from the herd centre, metres
    pub average_spread: f64,
    /// Largest distance from the herd centre, metres
    pub max_spread: f64,
    /// Herd centroid, absent for an empty herd
    pub herd_center: Option<GeoPoint>,
    /// An animal left the fence within the breach hold window
    pub fence_breach_active: bool,
}

impl HerdStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Update stats from current herd state
    pub fn update(&mut self, herd: &[Animal], active_strays: usize, fence_breach_active: bool) {
        self.total_cattle = herd.len();
        self.designated_stray_count = herd.iter().filter(|a| a.is_designated_stray).count();
        self.main_herd_count = self.total_cattle - self.designated_stray_count;
        self.active_stray_alerts = active_strays.min(self.total_cattle);
        self.fence_breach_active = fence_breach_active;
        self.herd_center = GeoPoint::centroid(herd.iter().map(|a| &a.position));

        match self.herd_center {
            Some(center) => {
                let spreads: Vec<f64> = herd
                    .iter()
                    .map(|a| a.position.distance_meters(&center))
                    .collect();
                self.average_spread = (spreads.iter().sum::<f64>() / spreads.len() as f64).round();
                self.max_spread = spreads.iter().cloned().fold(0.0, f64::max).round();
            }
            None => {
                self.average_spread = 0.0;
                self.max_spread = 0.0;
            }
        }
    }

    /// Format stats as a one-line summary
    pub fn summary(&self) -> String {
        format!(
            "T:{:6} | Cattle:{:4} | Main:{:4} | Designated:{:3} | Away:{:3} | Spread:{:5.0}m avg {:5.0}m max{}",
            self.tick,
            self.total_cattle,
            self.main_herd_count,
            self.designated_stray_count,
            self.active_stray_alerts,
            self.average_spread,
            self.max_spread,
            if self.fence_breach_active { " | BREACH" } else { "" },
        )
    }
}
