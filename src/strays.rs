//! Stray classification and tracking.
//!
//! After each movement step every animal is measured against the centroid
//! of the whole herd. Animals farther than `stray_distance_threshold` are
//! away; the tracker remembers when each one left so alerts can report how
//! long it has been gone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::config::HerdConfig;
use crate::geo::{GeoPoint, METERS_PER_DEGREE};
use crate::herd::Animal;

/// Base altitude of the simulated pasture, metres
pub const BASE_ALTITUDE: f64 = 850.0;
/// Metres of altitude per degree of latitude away from the centre
pub const ALTITUDE_GRADIENT: f64 = 2000.0;

/// When an animal was first seen away from the herd
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrayEntry {
    pub detected_at: DateTime<Utc>,
    pub initial_position: GeoPoint,
}

/// Nearest in-herd animal to a stray
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosestCow {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// Alert for an animal currently away from the herd
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrayAlert {
    pub cow_id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub altitude: i64,
    pub detected_at: DateTime<Utc>,
    pub duration: String,
    pub duration_minutes: i64,
    /// Degrees to the nearest in-herd animal; `None` when the whole herd is away
    pub distance_to_closest: Option<f64>,
    pub distance_to_closest_meters: Option<f64>,
    pub closest_cow: Option<ClosestCow>,
}

/// Per-animal classification result for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub distance_from_center: f64,
    pub is_stray: bool,
}

/// Everything the classifier learned this tick
#[derive(Debug, Clone, Default)]
pub struct ClassifierOutput {
    pub center: Option<GeoPoint>,
    /// One entry per animal, in herd order
    pub classifications: Vec<Classification>,
    /// One alert per active stray, in herd order
    pub alerts: Vec<StrayAlert>,
}

/// Side table of animals currently away, keyed by animal id
#[derive(Debug, Clone, Default)]
pub struct StrayTracker {
    entries: HashMap<String, StrayEntry>,
}

impl StrayTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&StrayEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Classify the herd and rebuild the alerts from scratch
    pub fn classify(
        &mut self,
        herd: &[Animal],
        config: &HerdConfig,
        ranch_center: GeoPoint,
        now: DateTime<Utc>,
    ) -> ClassifierOutput {
        let center = GeoPoint::centroid(herd.iter().map(|a| &a.position));

        // A lone animal (or none) cannot be away from itself
        let centroid = match center {
            Some(centroid) if herd.len() >= 2 => centroid,
            _ => {
                self.entries.clear();
                return ClassifierOutput {
                    center,
                    classifications: herd
                        .iter()
                        .map(|_| Classification {
                            distance_from_center: 0.0,
                            is_stray: false,
                        })
                        .collect(),
                    alerts: Vec::new(),
                };
            }
        };

        let classifications: Vec<Classification> = herd
            .iter()
            .map(|animal| {
                let distance = animal.position.distance(&centroid);
                Classification {
                    distance_from_center: distance,
                    is_stray: distance > config.stray_distance_threshold,
                }
            })
            .collect();

        // Drop animals that came back or are no longer in the herd
        let away: HashSet<&str> = herd
            .iter()
            .zip(&classifications)
            .filter(|(_, c)| c.is_stray)
            .map(|(a, _)| a.id())
            .collect();
        self.entries.retain(|id, _| away.contains(id.as_str()));
        for (animal, class) in herd.iter().zip(&classifications) {
            if class.is_stray {
                self.entries
                    .entry(animal.id().to_string())
                    .or_insert(StrayEntry {
                        detected_at: now,
                        initial_position: animal.position,
                    });
            }
        }

        let alerts = herd
            .iter()
            .zip(&classifications)
            .filter(|(_, c)| c.is_stray)
            .filter_map(|(animal, _)| {
                let entry = self.entries.get(animal.id())?;
                Some(build_alert(animal, entry, herd, &classifications, ranch_center, now))
            })
            .collect();

        ClassifierOutput {
            center,
            classifications,
            alerts,
        }
    }
}

fn build_alert(
    animal: &Animal,
    entry: &StrayEntry,
    herd: &[Animal],
    classifications: &[Classification],
    ranch_center: GeoPoint,
    now: DateTime<Utc>,
) -> StrayAlert {
    let closest = herd
        .iter()
        .zip(classifications)
        .filter(|(_, c)| !c.is_stray)
        .map(|(other, _)| (other, animal.position.distance(&other.position)))
        .min_by(|a, b| a.1.total_cmp(&b.1));

    let minutes = (now - entry.detected_at).num_minutes().max(0);

    StrayAlert {
        cow_id: animal.id().to_string(),
        name: animal.name().to_string(),
        lat: animal.position.lat,
        lon: animal.position.lon,
        altitude: altitude(&animal.position, ranch_center),
        detected_at: entry.detected_at,
        duration: format_duration(minutes),
        duration_minutes: minutes,
        distance_to_closest: closest.map(|(_, d)| d),
        distance_to_closest_meters: closest.map(|(_, d)| (d * METERS_PER_DEGREE).round()),
        closest_cow: closest.map(|(other, _)| ClosestCow {
            id: other.id().to_string(),
            name: other.name().to_string(),
            lat: other.position.lat,
            lon: other.position.lon,
        }),
    }
}

/// Simulated altitude in metres
pub fn altitude(position: &GeoPoint, ranch_center: GeoPoint) -> i64 {
    (BASE_ALTITUDE + (position.lat - ranch_center.lat) * ALTITUDE_GRADIENT).round() as i64
}

/// Human duration: "12 min", "1 h 5 min"
pub fn format_duration(minutes: i64) -> String {
    let minutes = minutes.max(0);
    let hours = minutes / 60;
    if hours > 0 {
        format!("{} h {} min", hours, minutes % 60)
    } else {
        format!("{} min", minutes)
    }
}
