//! Single-particle gun.

use crate::config::ParticleGunConfig;
use crate::{direction, EventSource};
use rand::Rng;
use tracklab_core::random::sample_uniform;
use tracklab_core::ConfigError;
use tracklab_types::{ParticleId, ParticleRecord, Provenance};

/// Shoots a configurable number of identical-species particles from a
/// common vertex.
#[derive(Clone, Debug)]
pub struct ParticleGun {
    config: ParticleGunConfig,
}

impl ParticleGun {
    /// Create a particle gun, validating its configuration.
    pub fn new(config: ParticleGunConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ParticleGunConfig {
        &self.config
    }
}

impl EventSource for ParticleGun {
    fn generate(&self, rng: &mut impl Rng) -> Vec<ParticleRecord> {
        let config = &self.config;
        let count = config.multiplicity.sample(rng);
        let (vertex, time) = config.vertex.sample(rng);

        (0..count)
            .map(|i| {
                let phi = sample_uniform(rng, config.phi.min, config.phi.max);
                let theta = config.eta.sample_theta(rng);
                let magnitude = sample_uniform(rng, config.momentum.min, config.momentum.max);
                let p = if config.momentum.transverse {
                    magnitude / theta.sin()
                } else {
                    magnitude
                };

                let flip = config.particle.randomize_charge && rng.gen_bool(0.5);
                let sign = if flip { -1 } else { 1 };

                ParticleRecord {
                    id: ParticleId::new(1, i),
                    pdg: sign * config.particle.pdg,
                    charge: f64::from(sign) * config.particle.charge,
                    mass: config.particle.mass,
                    momentum: direction(theta, phi) * p,
                    vertex,
                    time,
                    provenance: Provenance::HardScatter,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_two_particles_within_bounds() {
        let gun = ParticleGun::new(
            ParticleGunConfig::default()
                .with_count(2)
                .with_momentum(1.0, 10.0, true)
                .with_eta(-4.0, 4.0),
        )
        .unwrap();

        for seed in 0..50 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let particles = gun.generate(&mut rng);
            assert_eq!(particles.len(), 2);
            for particle in &particles {
                assert!(particle.pt() >= 1.0 - 1e-9 && particle.pt() <= 10.0 + 1e-9);
                assert!(particle.eta() >= -4.0 - 1e-9 && particle.eta() <= 4.0 + 1e-9);
                assert_eq!(particle.charge.abs(), 1.0);
                assert_eq!(particle.pdg.abs(), 13);
                assert_eq!(particle.provenance, Provenance::HardScatter);
            }
            assert_ne!(particles[0].id, particles[1].id);
        }
    }

    #[test]
    fn test_generation_is_deterministic() {
        let gun = ParticleGun::new(ParticleGunConfig::default().with_count(5)).unwrap();
        let a = gun.generate(&mut ChaCha8Rng::seed_from_u64(9));
        let b = gun.generate(&mut ChaCha8Rng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_charge_randomization_produces_both_signs() {
        let gun = ParticleGun::new(ParticleGunConfig::default().with_count(50)).unwrap();
        let particles = gun.generate(&mut ChaCha8Rng::seed_from_u64(1));
        assert!(particles.iter().any(|p| p.charge > 0.0 && p.pdg == -13));
        assert!(particles.iter().any(|p| p.charge < 0.0 && p.pdg == 13));
    }

    #[test]
    fn test_absolute_momentum_range() {
        let gun = ParticleGun::new(
            ParticleGunConfig::default()
                .with_count(20)
                .with_momentum(2.0, 3.0, false),
        )
        .unwrap();
        for particle in gun.generate(&mut ChaCha8Rng::seed_from_u64(4)) {
            assert!(particle.p() >= 2.0 - 1e-9 && particle.p() <= 3.0 + 1e-9);
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = ParticleGun::new(ParticleGunConfig::default().with_phi(1.0, -1.0));
        assert!(matches!(result, Err(ConfigError::InvalidRange { .. })));
    }
}
