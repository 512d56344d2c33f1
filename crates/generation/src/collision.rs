//! Bunch-crossing generator: one hard scatter plus pile-up.

use crate::config::{CollisionConfig, InteractionConfig};
use crate::{direction, EventSource};
use rand::Rng;
use std::f64::consts::PI;
use tracing::debug;
use tracklab_core::random::{sample_exponential, sample_uniform};
use tracklab_core::ConfigError;
use tracklab_types::kinematics::PION_MASS;
use tracklab_types::{ParticleId, ParticleRecord, Provenance};

/// PDG code of the positive pion.
const PDG_PION: i32 = 211;

/// PDG code of the photon.
const PDG_PHOTON: i32 = 22;

/// Generates a hard interaction overlaid with a configurable number of
/// pile-up interactions, each at its own vertex.
#[derive(Clone, Debug)]
pub struct CollisionGenerator {
    config: CollisionConfig,
}

impl CollisionGenerator {
    /// Create a generator, validating its configuration.
    pub fn new(config: CollisionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    fn interaction(
        &self,
        rng: &mut impl Rng,
        interaction: &InteractionConfig,
        vertex_number: u32,
        provenance: Provenance,
        out: &mut Vec<ParticleRecord>,
    ) {
        let (vertex, time) = self.config.vertex.sample(rng);
        let count = interaction.multiplicity.sample(rng);
        for i in 0..count {
            let pt = interaction.pt_min + sample_exponential(rng, interaction.pt_mean);
            let theta = interaction.eta.sample_theta(rng);
            let phi = sample_uniform(rng, -PI, PI);

            let neutral = rng.gen_bool(interaction.neutral_fraction);
            let (pdg, charge, mass) = if neutral {
                (PDG_PHOTON, 0.0, 0.0)
            } else if rng.gen_bool(0.5) {
                (PDG_PION, 1.0, PION_MASS)
            } else {
                (-PDG_PION, -1.0, PION_MASS)
            };

            out.push(ParticleRecord {
                id: ParticleId::new(vertex_number, i),
                pdg,
                charge,
                mass,
                momentum: direction(theta, phi) * (pt / theta.sin()),
                vertex,
                time,
                provenance,
            });
        }
    }
}

impl EventSource for CollisionGenerator {
    fn generate(&self, rng: &mut impl Rng) -> Vec<ParticleRecord> {
        let mut particles = Vec::new();
        self.interaction(
            rng,
            &self.config.hard_scatter,
            1,
            Provenance::HardScatter,
            &mut particles,
        );

        let pile_up = self.config.pile_up.sample(rng);
        for k in 0..pile_up {
            self.interaction(
                rng,
                &self.config.pile_up_interaction,
                k + 2,
                Provenance::PileUp,
                &mut particles,
            );
        }

        debug!(
            pile_up,
            particles = particles.len(),
            "Generated bunch crossing"
        );
        particles
    }
}
