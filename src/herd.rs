//! Animals, cattle identities and herd generation.

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::config::{HerdConfig, MAX_CATTLE};
use crate::geo::{FencePolygon, GeoPoint};

/// Attempts at placing an anchor inside the fence before falling back to the centre
const ANCHOR_ATTEMPTS: usize = 100;

/// Errors reading a cattle registry file
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read cattle registry: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse cattle registry: {0}")]
    Json(#[from] serde_json::Error),
}

/// Registry record for a named animal.
///
/// Backend records carry explicit `null`s for readings that were never
/// taken (`weight`, `temperature`) and for optional text; those decode to
/// `None` or the field default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CattleIdentity {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ear_tag: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub breed: String,
    #[serde(default)]
    pub weight: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default = "default_health_status", deserialize_with = "health_status_or_default")]
    pub health_status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vaccines: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pasture: Option<String>,
}

fn default_health_status() -> String {
    "healthy".to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn health_status_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_health_status))
}

impl CattleIdentity {
    /// Synthetic identity for the `index`-th animal (0-based)
    pub fn generated<R: Rng + ?Sized>(index: usize, rng: &mut R) -> Self {
        let tag = format!("3S-{:03}", index + 1);
        Self {
            id: tag.clone(),
            ear_tag: tag,
            name: format!("Cattle {}", index + 1),
            breed: "Angus".to_string(),
            weight: Some(rng.gen_range(800..1400)),
            temperature: Some((rng.gen_range(99.0..103.0_f64) * 10.0).round() / 10.0),
            health_status: default_health_status(),
            vaccines: Vec::new(),
            pasture: None,
        }
    }
}

/// Named cattle loaded from a JSON file
#[derive(Debug, Clone, Default)]
pub struct CattleRegistry {
    cattle: Vec<CattleIdentity>,
}

impl CattleRegistry {
    /// Build a registry; anything past [`MAX_CATTLE`] is dropped
    pub fn new(mut cattle: Vec<CattleIdentity>) -> Self {
        if cattle.len() > MAX_CATTLE {
            log::warn!(
                "Cattle registry has {} records, simulating the first {}",
                cattle.len(),
                MAX_CATTLE
            );
            cattle.truncate(MAX_CATTLE);
        }
        Self { cattle }
    }

    /// Read a registry from a JSON array file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let data = std::fs::read_to_string(path)?;
        let cattle: Vec<CattleIdentity> = serde_json::from_str(&data)?;
        Ok(Self::new(cattle))
    }

    /// Load a registry, falling back to an empty one.
    ///
    /// A missing or unreadable file yields an empty registry.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No cattle registry at {} - using generated cattle", path.display());
            return Self::default();
        }

        match Self::from_file(path) {
            Ok(registry) => {
                log::info!("Loaded {} cattle from registry", registry.len());
                registry
            }
            Err(e) => {
                log::error!("Error loading cattle registry {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.cattle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cattle.is_empty()
    }

    pub fn cattle(&self) -> &[CattleIdentity] {
        &self.cattle
    }
}

/// One simulated cow
#[derive(Debug, Clone)]
pub struct Animal {
    pub identity: CattleIdentity,
    /// Home point, fixed at reset
    pub anchor: GeoPoint,
    /// Current location
    pub position: GeoPoint,
    /// Pre-selected to roam a wider radius
    pub is_designated_stray: bool,
    /// Random-walk heading in radians
    pub(crate) heading: f64,
    /// Last random-walk step length in degrees
    pub(crate) speed: f64,
}

impl Animal {
    pub fn new(identity: CattleIdentity, anchor: GeoPoint, is_designated_stray: bool) -> Self {
        Self {
            identity,
            anchor,
            position: anchor,
            is_designated_stray,
            heading: 0.0,
            speed: 0.0,
        }
    }

    pub fn id(&self) -> &str {
        &self.identity.id
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }
}

/// Where the herd lives
#[derive(Debug, Clone)]
pub struct Pasture {
    pub center: GeoPoint,
    pub fence: Option<FencePolygon>,
}

impl Pasture {
    /// Resolve the ranch centre: explicit centre, then fence midpoint,
    /// then [`crate::geo::DEFAULT_CENTER`].
    pub fn resolve(center: Option<GeoPoint>, fence: Option<FencePolygon>) -> Self {
        let center = center
            .filter(GeoPoint::is_finite)
            .or_else(|| fence.as_ref().map(|f| f.bounds().center()))
            .unwrap_or(crate::geo::DEFAULT_CENTER);
        Self { center, fence }
    }

    /// Random anchor within `radius` of the centre, inside the fence when there is one
    pub fn random_anchor<R: Rng + ?Sized>(&self, radius: f64, rng: &mut R) -> GeoPoint {
        let Some(fence) = &self.fence else {
            return self.center.random_within(radius, rng);
        };

        for _ in 0..ANCHOR_ATTEMPTS {
            let candidate = self.center.random_within(radius, rng);
            if fence.contains(&candidate) {
                return candidate;
            }
        }
        self.center
    }
}

impl Default for Pasture {
    fn default() -> Self {
        Self::resolve(None, None)
    }
}

/// Generate a fresh herd.
///
/// The herd takes its size from the registry when one is loaded, otherwise
/// from `config.total_cattle_count`. Designated strays are sampled without
/// replacement from the whole herd.
pub fn generate_herd<R: Rng + ?Sized>(
    config: &HerdConfig,
    pasture: &Pasture,
    registry: &CattleRegistry,
    rng: &mut R,
) -> Vec<Animal> {
    let size = if registry.is_empty() {
        config.total_cattle_count
    } else {
        registry.len()
    };

    let stray_count = config.designated_stray_count(size);
    let mut designated = vec![false; size];
    for i in index::sample(rng, size, stray_count) {
        designated[i] = true;
    }

    let mut herd = Vec::with_capacity(size);
    for (i, is_stray) in designated.into_iter().enumerate() {
        let identity = match registry.cattle().get(i) {
            Some(identity) => identity.clone(),
            None => CattleIdentity::generated(i, rng),
        };
        let radius = if is_stray {
            config.stray_radius
        } else {
            config.cluster_radius
        };
        let anchor = pasture.random_anchor(radius, rng);
        let mut animal = Animal::new(identity, anchor, is_stray);
        animal.heading = rng.gen_range(0.0..std::f64::consts::TAU);
        herd.push(animal);
    }

    herd
}
