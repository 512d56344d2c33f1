//! Bottom-middle-top triplet seeding.

use serde::{Deserialize, Serialize};
use tracklab_core::ConfigError;
use tracklab_types::kinematics::{bending_radius, wrap_phi};
use tracklab_types::{Seed, SpacePoint};

/// Cuts of the triplet seed finder. Lengths in mm, momenta in GeV.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripletSeedingConfig {
    /// Space points beyond this radius are not used.
    pub r_max: f64,
    pub delta_r_min: f64,
    pub delta_r_max: f64,
    /// Largest |cot θ| of a doublet; 27.29 corresponds to |η| = 4.
    pub cot_theta_max: f64,
    pub collision_region_min: f64,
    pub collision_region_max: f64,
    /// Largest azimuth difference between doublet members.
    pub delta_phi_max: f64,
    /// Largest difference between the bottom and top doublet slopes.
    pub cot_theta_tolerance: f64,
    pub min_pt: f64,
    /// Largest transverse impact parameter of the triplet circle.
    pub impact_max: f64,
    pub max_seeds_per_middle: usize,
}

impl Default for TripletSeedingConfig {
    fn default() -> Self {
        Self {
            r_max: 200.0,
            delta_r_min: 5.0,
            delta_r_max: 150.0,
            cot_theta_max: 27.2899,
            collision_region_min: -150.0,
            collision_region_max: 150.0,
            delta_phi_max: 0.1,
            cot_theta_tolerance: 0.05,
            min_pt: 0.5,
            impact_max: 3.0,
            max_seeds_per_middle: 1,
        }
    }
}

impl TripletSeedingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_range("triplet.delta_r", self.delta_r_min, self.delta_r_max)?;
        ConfigError::check_range(
            "triplet.collision_region",
            self.collision_region_min,
            self.collision_region_max,
        )?;
        if self.max_seeds_per_middle == 0 {
            return Err(ConfigError::invalid(
                "triplet.max_seeds_per_middle",
                "must be at least 1",
            ));
        }
        if !(self.min_pt >= 0.0 && self.impact_max >= 0.0) {
            return Err(ConfigError::invalid(
                "triplet",
                "min_pt and impact_max must not be negative",
            ));
        }
        Ok(())
    }
}

struct Doublet {
    partner: usize,
    cot_theta: f64,
    z0: f64,
}

/// Find triplet seeds among `points` in a field `bz` (T).
pub fn find_triplet_seeds(
    points: &[SpacePoint],
    config: &TripletSeedingConfig,
    bz: f64,
) -> Vec<Seed> {
    let mut order: Vec<usize> = (0..points.len())
        .filter(|&i| points[i].r() <= config.r_max)
        .collect();
    order.sort_by(|&a, &b| points[a].r().total_cmp(&points[b].r()));

    let r_min_circle = bending_radius(config.min_pt, 1.0, bz).unwrap_or(0.0);
    let mut seeds = Vec::new();

    for &middle in &order {
        let m = &points[middle];
        let bottoms = doublets(points, &order, m, config, true);
        if bottoms.is_empty() {
            continue;
        }
        let tops = doublets(points, &order, m, config, false);

        let mut candidates: Vec<(f64, [usize; 3], f64)> = Vec::new();
        for bottom in &bottoms {
            for top in &tops {
                let b = &points[bottom.partner];
                let t = &points[top.partner];
                if b.region() == t.region() {
                    continue;
                }
                let delta_cot = (bottom.cot_theta - top.cot_theta).abs();
                if delta_cot > config.cot_theta_tolerance {
                    continue;
                }
                let Some((radius, d0)) = circle_through(b, m, t) else {
                    continue;
                };
                if radius < r_min_circle || d0 > config.impact_max {
                    continue;
                }
                let score = delta_cot / config.cot_theta_tolerance.max(f64::EPSILON)
                    + d0 / config.impact_max.max(f64::EPSILON);
                candidates.push((score, [bottom.partner, middle, top.partner], bottom.z0));
            }
        }

        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));
        for (score, triplet, z0) in candidates.into_iter().take(config.max_seeds_per_middle) {
            let measurements = triplet.iter().map(|&i| points[i].measurement).collect();
            if let Ok(seed) = Seed::new(
                measurements,
                points[triplet[0]].region(),
                z0,
                1.0 / (1.0 + score),
            ) {
                seeds.push(seed);
            }
        }
    }
    seeds
}

fn doublets(
    points: &[SpacePoint],
    order: &[usize],
    middle: &SpacePoint,
    config: &TripletSeedingConfig,
    inward: bool,
) -> Vec<Doublet> {
    order
        .iter()
        .filter_map(|&i| {
            let other = &points[i];
            let (inner, outer) = if inward {
                (other, middle)
            } else {
                (middle, other)
            };
            let dr = outer.r() - inner.r();
            if dr < config.delta_r_min || dr > config.delta_r_max {
                return None;
            }
            if other.region() == middle.region() {
                return None;
            }
            if wrap_phi(outer.phi() - inner.phi()).abs() > config.delta_phi_max {
                return None;
            }
            let cot_theta = (outer.z() - inner.z()) / dr;
            if cot_theta.abs() > config.cot_theta_max {
                return None;
            }
            let z0 = inner.z() - inner.r() * cot_theta;
            if z0 < config.collision_region_min || z0 > config.collision_region_max {
                return None;
            }
            Some(Doublet {
                partner: i,
                cot_theta,
                z0,
            })
        })
        .collect()
}

/// Radius of the transverse circle through three points and its distance
/// of closest approach to the beam line.
fn circle_through(a: &SpacePoint, b: &SpacePoint, c: &SpacePoint) -> Option<(f64, f64)> {
    let (ax, ay) = (a.position.x, a.position.y);
    let (bx, by) = (b.position.x, b.position.y);
    let (cx, cy) = (c.position.x, c.position.y);
    let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
    if d.abs() < 1e-12 {
        // Collinear points: an infinitely stiff track through the line.
        let direction = (c.position.xy() - a.position.xy()).try_normalize(1e-12)?;
        let d0 = (a.position.x * direction.y - a.position.y * direction.x).abs();
        return Some((f64::INFINITY, d0));
    }
    let a2 = ax * ax + ay * ay;
    let b2 = bx * bx + by * by;
    let c2 = cx * cx + cy * cy;
    let ux = (a2 * (by - cy) + b2 * (cy - ay) + c2 * (ay - by)) / d;
    let uy = (a2 * (cx - bx) + b2 * (ax - cx) + c2 * (bx - ax)) / d;
    let radius = ((ax - ux).powi(2) + (ay - uy).powi(2)).sqrt();
    let d0 = ((ux * ux + uy * uy).sqrt() - radius).abs();
    Some((radius, d0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tracklab_types::{GeometryId, MeasurementIndex, Vector3};

    fn point(index: u32, layer: u32, r: f64, phi: f64, z: f64) -> SpacePoint {
        SpacePoint {
            measurement: MeasurementIndex(index),
            surface: GeometryId::new(8, layer, 1),
            position: Vector3::new(r * phi.cos(), r * phi.sin(), z),
            var_r: 0.0,
            var_z: 0.0,
        }
    }

    /// Points on a circle of radius `radius` through the origin.
    fn track(first_index: u32, radius: f64, phi0: f64, cot_theta: f64) -> Vec<SpacePoint> {
        [32.0, 72.0, 116.0, 172.0]
            .iter()
            .enumerate()
            .map(|(i, &r)| {
                // Chord of length r subtends an azimuth offset asin(r / 2R).
                let phi = phi0 + (r / (2.0 * radius)).asin();
                point(first_index + i as u32, 2 * (i as u32 + 1), r, phi, 5.0 + r * cot_theta)
            })
            .collect()
    }

    #[test]
    fn test_finds_seed_on_stiff_track() {
        let points = track(0, 5000.0, 0.3, 0.5);
        let seeds = find_triplet_seeds(&points, &TripletSeedingConfig::default(), 2.0);
        // One seed each for the middle points at 72 and 116 mm.
        assert_eq!(seeds.len(), 2);
        for seed in &seeds {
            assert_eq!(seed.measurements().len(), 3);
            assert_relative_eq!(seed.z_vertex(), 5.0, epsilon = 1e-6);
            assert!(seed.quality() > 0.0 && seed.quality() <= 1.0);
        }
        assert_eq!(
            &seeds[0].measurements()[..2],
            &[MeasurementIndex(0), MeasurementIndex(1)]
        );
    }

    #[test]
    fn test_soft_track_rejected_by_min_pt() {
        // A 0.1 GeV track in 2 T bends with a radius of about 167 mm.
        let points = track(0, 167.0, 0.3, 0.0);
        let config = TripletSeedingConfig {
            delta_phi_max: 1.0,
            ..Default::default()
        };
        assert!(find_triplet_seeds(&points, &config, 2.0).is_empty());
    }

    #[test]
    fn test_displaced_vertex_rejected() {
        let points: Vec<_> = track(0, 5000.0, 0.3, 0.5)
            .into_iter()
            .map(|mut p| {
                p.position.z += 400.0;
                p
            })
            .collect();
        assert!(find_triplet_seeds(&points, &TripletSeedingConfig::default(), 2.0).is_empty());
    }

    #[test]
    fn test_no_points_no_seeds() {
        assert!(find_triplet_seeds(&[], &TripletSeedingConfig::default(), 2.0).is_empty());
    }
}
