//! Movement integrator - one step of herd motion.
//!
//! Each animal's displacement is the sum of four influences:
//! random walk, anchor pull, herd cohesion and boundary avoidance. The sum
//! is capped at `movement_limit`, so no animal ever jumps farther than that
//! in a single tick. The fence only biases motion; animals can still end up
//! outside it.

use rand::Rng;

use crate::config::HerdConfig;
use crate::geo::{GeoPoint, Vector};
use crate::herd::{Animal, Pasture};

/// Distance from a fence edge (degrees, ~300 m) at which avoidance kicks in
pub const BOUNDARY_MARGIN: f64 = 0.003;

/// Outcome of moving the whole herd once
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveOutcome {
    /// Animals that ended the step outside the fence
    pub outside_fence: usize,
    /// Animals whose displacement was discarded as non-finite
    pub rejected: usize,
}

/// Centroid the main herd is pulled toward.
///
/// Uses the non-designated animals; when every animal is designated, the
/// whole herd is used instead.
pub fn cohesion_center(herd: &[Animal]) -> Option<GeoPoint> {
    GeoPoint::centroid(
        herd.iter()
            .filter(|a| !a.is_designated_stray)
            .map(|a| &a.position),
    )
    .or_else(|| GeoPoint::centroid(herd.iter().map(|a| &a.position)))
}

/// Cohesion weight for an animal
#[inline]
pub fn cohesion_weight(config: &HerdConfig, is_designated_stray: bool) -> f64 {
    if is_designated_stray {
        config.herd_cohesion * config.stray_cohesion_factor
    } else {
        config.herd_cohesion
    }
}

/// Push back toward the ranch centre when near or outside the fence
pub fn boundary_force(config: &HerdConfig, pasture: &Pasture, position: &GeoPoint) -> Vector {
    let Some(fence) = &pasture.fence else {
        return Vector::ZERO;
    };
    if config.boundary_avoidance_strength <= 0.0 {
        return Vector::ZERO;
    }

    let falloff = if !fence.contains(position) {
        1.0
    } else {
        let distance = fence.distance_to_edge(position);
        if distance >= BOUNDARY_MARGIN {
            return Vector::ZERO;
        }
        1.0 - distance / BOUNDARY_MARGIN
    };

    position
        .toward(&pasture.center)
        .scale(config.boundary_avoidance_strength * falloff)
}

/// Compute one animal's displacement for this tick, before the hard cap
pub fn displacement<R: Rng + ?Sized>(
    animal: &mut Animal,
    herd_center: Option<GeoPoint>,
    config: &HerdConfig,
    pasture: &Pasture,
    rng: &mut R,
) -> Vector {
    let position = animal.position;

    // Random walk: fresh heading and step length every tick
    animal.heading = rng.gen_range(0.0..std::f64::consts::TAU);
    animal.speed = rng.gen::<f64>() * config.movement_speed;
    let mut delta = Vector::from_heading(animal.heading, animal.speed);

    // Anchor pull, proportional to the distance from home
    delta = delta.add(position.toward(&animal.anchor).scale(config.anchor_pull));

    // Cohesion toward the main herd
    if let Some(center) = herd_center {
        let weight = cohesion_weight(config, animal.is_designated_stray);
        delta = delta.add(position.toward(&center).scale(weight));
    }

    delta.add(boundary_force(config, pasture, &position))
}

/// Advance every animal by one step.
///
/// All animals see the same cohesion centre, taken before anyone moves.
pub fn step_herd<R: Rng + ?Sized>(
    herd: &mut [Animal],
    config: &HerdConfig,
    pasture: &Pasture,
    rng: &mut R,
) -> MoveOutcome {
    let mut outcome = MoveOutcome::default();
    let herd_center = cohesion_center(herd);

    for animal in herd.iter_mut() {
        let delta = displacement(animal, herd_center, config, pasture, rng)
            .clamp_length(config.movement_limit);

        let next = animal.position.offset(delta);
        if !delta.is_finite() || !next.is_finite() {
            log::warn!(
                "Discarding non-finite move for {} at ({}, {})",
                animal.id(),
                animal.position.lat,
                animal.position.lon
            );
            outcome.rejected += 1;
            continue;
        }
        animal.position = next;

        if let Some(fence) = &pasture.fence {
            if !fence.contains(&animal.position) {
                outcome.outside_fence += 1;
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::FencePolygon;
    use crate::herd::{generate_herd, CattleIdentity, CattleRegistry};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn animal(id: usize, lat: f64, lon: f64, stray: bool) -> Animal {
        let mut rng = ChaCha8Rng::seed_from_u64(id as u64);
        Animal::new(
            CattleIdentity::generated(id, &mut rng),
            GeoPoint::new(lat, lon),
            stray,
        )
    }

    fn fenced_pasture() -> Pasture {
        let fence = FencePolygon::from_coordinates(vec![
            [-106.02, 34.98],
            [-105.98, 34.98],
            [-105.98, 35.02],
            [-106.02, 35.02],
        ]);
        Pasture::resolve(Some(GeoPoint::new(35.0, -106.0)), fence)
    }

    #[test]
    fn test_displacement_never_exceeds_limit() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut config = HerdConfig::default();
        // Strong forces so the cap is actually exercised
        config.herd_cohesion = 1.0;
        config.anchor_pull = 1.0;
        config.boundary_avoidance_strength = 1.0;
        config.movement_speed = 0.01;

        let pasture = fenced_pasture();
        let mut herd = generate_herd(&config, &pasture, &CattleRegistry::default(), &mut rng);
        // Scatter some animals far from home, a few outside the fence
        for (i, a) in herd.iter_mut().enumerate() {
            a.position.lat += (i as f64 - 25.0) * 0.002;
        }

        for _ in 0..50 {
            let before: Vec<GeoPoint> = herd.iter().map(|a| a.position).collect();
            step_herd(&mut herd, &config, &pasture, &mut rng);
            for (a, b) in herd.iter().zip(before.iter()) {
                let moved = a.position.distance(b);
                assert!(
                    moved <= config.movement_limit * (1.0 + 1e-9),
                    "moved {moved} > limit {}",
                    config.movement_limit
                );
            }
        }
    }

    #[test]
    fn test_anchor_pull_keeps_animals_home() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut config = HerdConfig::default();
        config.herd_cohesion = 0.0;
        let pasture = Pasture::default();
        let mut herd = vec![animal(0, 35.0, -106.0, false)];

        for _ in 0..2000 {
            step_herd(&mut herd, &config, &pasture, &mut rng);
        }
        // Equilibrium drift is on the order of movement_speed / anchor_pull
        let drift = herd[0].position.distance(&herd[0].anchor);
        assert!(drift < 20.0 * config.movement_speed / config.anchor_pull, "drift {drift}");
    }

    #[test]
    fn test_strays_resist_cohesion() {
        let config = HerdConfig::default();
        assert_eq!(cohesion_weight(&config, false), config.herd_cohesion);
        assert!(
            (cohesion_weight(&config, true) - config.herd_cohesion * config.stray_cohesion_factor).abs()
                < 1e-15
        );
        assert!(cohesion_weight(&config, true) < cohesion_weight(&config, false));
    }

    #[test]
    fn test_cohesion_center_ignores_designated_strays() {
        let herd = vec![
            animal(0, 0.0, 0.0, false),
            animal(1, 2.0, 0.0, false),
            animal(2, 100.0, 100.0, true),
        ];
        assert_eq!(cohesion_center(&herd), Some(GeoPoint::new(1.0, 0.0)));

        let all_strays = vec![animal(0, 0.0, 0.0, true), animal(1, 2.0, 2.0, true)];
        assert_eq!(cohesion_center(&all_strays), Some(GeoPoint::new(1.0, 1.0)));
        assert_eq!(cohesion_center(&[]), None);
    }

    #[test]
    fn test_boundary_force() {
        let config = HerdConfig::default();
        let pasture = fenced_pasture();

        // Deep inside: no force
        let inside = GeoPoint::new(35.0, -106.0);
        assert_eq!(boundary_force(&config, &pasture, &inside), Vector::ZERO);

        // Near the northern edge: pushed south
        let near = GeoPoint::new(35.019, -106.0);
        let force = boundary_force(&config, &pasture, &near);
        assert!(force.dlat < 0.0);

        // Outside: full strength toward the centre
        let outside = GeoPoint::new(35.03, -106.0);
        let force = boundary_force(&config, &pasture, &outside);
        assert!((force.dlat - (-0.03 * config.boundary_avoidance_strength)).abs() < 1e-9);

        // No fence: no force
        assert_eq!(boundary_force(&config, &Pasture::default(), &outside), Vector::ZERO);
    }

    #[test]
    fn test_outside_fence_is_reported_not_clamped() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut config = HerdConfig::default();
        config.movement_speed = 0.0;
        config.movement_limit = 0.0001;
        let pasture = fenced_pasture();
        let mut herd = vec![animal(0, 35.05, -106.0, false)];
        herd[0].position = GeoPoint::new(35.05, -106.0);

        let outcome = step_herd(&mut herd, &config, &pasture, &mut rng);
        assert_eq!(outcome.outside_fence, 1);
        assert!(!pasture.fence.as_ref().unwrap().contains(&herd[0].position));
    }

    #[test]
    fn test_non_finite_move_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut config = HerdConfig::default();
        config.movement_speed = f64::NAN;
        let mut herd = vec![animal(0, 35.0, -106.0, false)];

        let outcome = step_herd(&mut herd, &config, &Pasture::default(), &mut rng);
        assert_eq!(outcome.rejected, 1);
        assert!(herd[0].position.is_finite());
    }
}
