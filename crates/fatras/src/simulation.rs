//! Layer-to-layer propagation of truth particles.

use crate::config::FatrasConfig;
use crate::material::{energy_loss, highland_theta0, scatter};
use rand::Rng;
use tracklab_core::RandomStream;
use tracklab_detector::{Helix, MagneticField, TrackingGeometry};
use tracklab_types::{ParticleRecord, SimulatedHit};

/// Consumer name of the per-particle random streams.
const STREAM: &str = "fatras";

/// Propagate `particles` through the detector and record their hits.
///
/// Hits are grouped by particle in input order and numbered along each
/// particle. Every particle draws from its own substream, so the hits of
/// one particle do not depend on which other particles are simulated.
pub fn propagate(
    particles: &[ParticleRecord],
    geometry: &dyn TrackingGeometry,
    field: &dyn MagneticField,
    random: &RandomStream,
    config: &FatrasConfig,
) -> Vec<SimulatedHit> {
    let mut hits = Vec::new();
    for particle in particles {
        if !particle.is_charged() {
            continue;
        }
        let mut rng = random.spawn_indexed(STREAM, particle.id.as_u64());
        simulate_particle(particle, geometry, field, &mut rng, config, &mut hits);
    }
    hits
}

fn simulate_particle(
    particle: &ParticleRecord,
    geometry: &dyn TrackingGeometry,
    field: &dyn MagneticField,
    rng: &mut impl Rng,
    config: &FatrasConfig,
    hits: &mut Vec<SimulatedHit>,
) {
    let Some(mut direction) = particle.momentum.try_normalize(1e-12) else {
        return;
    };
    let mut position = particle.vertex;
    let mut momentum = particle.p();
    let mut path_length = 0.0;
    let mut index = 0u32;

    for _ in 0..config.max_crossings {
        if momentum * direction.xy().norm() < config.pt_min {
            break;
        }
        let helix = Helix::new(
            position,
            direction,
            momentum,
            particle.charge,
            field.bz_at(&position),
        );
        // No crossing means the particle left the world volume.
        let Some(crossing) = geometry.next_crossing(&helix) else {
            break;
        };
        path_length += crossing.path_length;
        if path_length > config.max_path_length {
            break;
        }
        position = crossing.position;
        direction = crossing.direction;

        let layer = &geometry.layers()[crossing.layer];
        if let Some(surface) = layer.surface_at(&position) {
            hits.push(SimulatedHit {
                particle: particle.id,
                surface: surface.id(),
                position,
                direction,
                momentum,
                index,
            });
            index += 1;
        }

        if layer.thickness_x0() > 0.0 {
            let incidence = direction.dot(&layer.normal_at(&position)).abs().max(1e-3);
            let x_over_x0 = layer.thickness_x0() / incidence;
            if config.multiple_scattering {
                let theta0 = highland_theta0(momentum, particle.mass, particle.charge, x_over_x0);
                direction = scatter(rng, &direction, theta0);
            }
            if config.energy_loss {
                match energy_loss(momentum, particle.mass, x_over_x0) {
                    Some(p) => momentum = p,
                    None => break,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracklab_core::RandomNumbers;
    use tracklab_detector::{ConstantField, DetectorGeometry};
    use tracklab_types::{EventIndex, ParticleId, Provenance, Vector3};

    fn muon(number: u32, momentum: Vector3<f64>, charge: f64) -> ParticleRecord {
        ParticleRecord {
            id: ParticleId::new(1, number),
            pdg: 13,
            charge,
            mass: 0.105_658_4,
            momentum,
            vertex: Vector3::zeros(),
            time: 0.0,
            provenance: Provenance::HardScatter,
        }
    }

    fn stream() -> RandomStream {
        RandomNumbers::new(7).event_stream(EventIndex(0))
    }

    #[test]
    fn test_central_muon_hits_every_barrel_layer() {
        let geometry = DetectorGeometry::generic().unwrap();
        let field = ConstantField::solenoid(2.0);
        let particles = vec![muon(0, Vector3::new(10.0, 0.0, 0.0), -1.0)];
        let hits = propagate(
            &particles,
            &geometry,
            &field,
            &stream(),
            &FatrasConfig::default().without_material(),
        );

        let volumes: Vec<u32> = hits.iter().map(|h| h.surface.volume).collect();
        assert_eq!(volumes, vec![8, 8, 8, 8, 13, 13, 13, 13, 13]);
        assert!(hits.windows(2).all(|w| w[0].r() < w[1].r()));
        assert!(hits.iter().enumerate().all(|(i, h)| h.index == i as u32));
        assert!(hits.iter().all(|h| h.position.z.abs() < 1e-9));
    }

    #[test]
    fn test_neutral_particles_leave_no_hits() {
        let geometry = DetectorGeometry::generic().unwrap();
        let field = ConstantField::solenoid(2.0);
        let particles = vec![muon(0, Vector3::new(5.0, 1.0, 2.0), 0.0)];
        let hits = propagate(&particles, &geometry, &field, &stream(), &FatrasConfig::default());
        assert!(hits.is_empty());
    }

    #[test]
    fn test_soft_particle_below_pt_min() {
        let geometry = DetectorGeometry::generic().unwrap();
        let field = ConstantField::solenoid(2.0);
        let particles = vec![muon(0, Vector3::new(0.04, 0.0, 0.0), 1.0)];
        let hits = propagate(&particles, &geometry, &field, &stream(), &FatrasConfig::default());
        assert!(hits.is_empty());
    }

    #[test]
    fn test_crossing_limit() {
        let geometry = DetectorGeometry::generic().unwrap();
        let field = ConstantField::solenoid(2.0);
        let particles = vec![muon(0, Vector3::new(10.0, 0.0, 0.0), 1.0)];
        // Beam pipe plus two pixel layers.
        let config = FatrasConfig::default().with_max_crossings(3);
        let hits = propagate(&particles, &geometry, &field, &stream(), &config);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_particles_are_simulated_independently() {
        let geometry = DetectorGeometry::generic().unwrap();
        let field = ConstantField::solenoid(2.0);
        let a = muon(0, Vector3::new(2.0, 1.0, 0.5), -1.0);
        let b = muon(1, Vector3::new(-1.0, 3.0, -1.0), 1.0);
        let config = FatrasConfig::default();

        let both = propagate(&[a, b.clone()], &geometry, &field, &stream(), &config);
        let alone = propagate(&[b.clone()], &geometry, &field, &stream(), &config);
        let from_b: Vec<_> = both.into_iter().filter(|h| h.particle == b.id).collect();
        assert!(!alone.is_empty());
        assert_eq!(from_b, alone);
    }

    #[test]
    fn test_scattering_changes_trajectory() {
        let geometry = DetectorGeometry::generic().unwrap();
        let field = ConstantField::solenoid(2.0);
        let particles = vec![muon(0, Vector3::new(1.0, 0.0, 0.3), -1.0)];
        let ideal = propagate(
            &particles,
            &geometry,
            &field,
            &stream(),
            &FatrasConfig::default().without_material(),
        );
        let real = propagate(&particles, &geometry, &field, &stream(), &FatrasConfig::default());
        assert_eq!(ideal.len(), real.len());
        assert_ne!(ideal.last().unwrap().position, real.last().unwrap().position);
    }
}
