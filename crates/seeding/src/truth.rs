//! Truth-estimated seeding.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracklab_core::ConfigError;
use tracklab_types::{
    Measurement, ParticleId, ParticleRecord, RegionId, Seed, SimulatedHit, MAX_SEED_SIZE,
    MIN_SEED_SIZE,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TruthSeedingConfig {
    /// Measurements per seed.
    pub seed_size: usize,
}

impl Default for TruthSeedingConfig {
    fn default() -> Self {
        Self { seed_size: 3 }
    }
}

impl TruthSeedingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if (MIN_SEED_SIZE..=MAX_SEED_SIZE).contains(&self.seed_size) {
            Ok(())
        } else {
            Err(ConfigError::invalid("truth.seed_size", "must be 3 or 4"))
        }
    }
}

/// One seed per selected particle from its innermost measurements on
/// distinct layers.
///
/// A measurement belongs to every particle among its hits. Particles with
/// too few distinct layers produce no seed.
pub fn find_truth_seeds(
    particles: &[ParticleRecord],
    hits: &[SimulatedHit],
    measurements: &[Measurement],
    config: &TruthSeedingConfig,
) -> Vec<Seed> {
    let mut by_particle: HashMap<ParticleId, Vec<&Measurement>> = HashMap::new();
    for measurement in measurements {
        let mut seen: Vec<ParticleId> = Vec::new();
        for hit in &measurement.hits {
            if let Some(hit) = hits.get(hit.as_usize()) {
                if !seen.contains(&hit.particle) {
                    seen.push(hit.particle);
                    by_particle.entry(hit.particle).or_default().push(measurement);
                }
            }
        }
    }

    let mut seeds = Vec::new();
    for particle in particles {
        let Some(owned) = by_particle.get_mut(&particle.id) else {
            continue;
        };
        owned.sort_by(|a, b| a.r().total_cmp(&b.r()));

        let mut layers: Vec<RegionId> = Vec::with_capacity(config.seed_size);
        let mut chosen = Vec::with_capacity(config.seed_size);
        for m in owned.iter() {
            if layers.contains(&m.region()) {
                continue;
            }
            layers.push(m.region());
            chosen.push(m.index);
            if chosen.len() == config.seed_size {
                break;
            }
        }
        if chosen.len() < config.seed_size {
            continue;
        }
        if let Ok(seed) = Seed::new(chosen, layers[0], particle.vertex.z, 1.0) {
            seeds.push(seed);
        }
    }
    seeds
}
