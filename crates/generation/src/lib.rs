//! Event sources for tracklab.
//!
//! An [`EventSource`] produces the initial truth particles of an event
//! from the event's random stream. Two sources are provided:
//!
//! - [`ParticleGun`]: a fixed or sampled number of single particles from
//!   configured momentum, pseudorapidity and azimuth ranges
//! - [`CollisionGenerator`]: one hard interaction plus pile-up
//!   interactions, each at its own smeared vertex

mod collision;
mod config;
mod gun;
mod stage;

pub use collision::CollisionGenerator;
pub use config::{
    CollisionConfig, EtaConfig, InteractionConfig, MomentumConfig, Multiplicity, ParticleConfig,
    ParticleGunConfig, PhiConfig, VertexConfig,
};
pub use gun::ParticleGun;
pub use stage::EventGenerationStage;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracklab_core::ConfigError;
use tracklab_types::{ParticleRecord, Vector3};

/// Trait for producing the truth particles of one event.
pub trait EventSource {
    /// Generate the particles of one event.
    ///
    /// Deterministic given the generator state of `rng`.
    fn generate(&self, rng: &mut impl Rng) -> Vec<ParticleRecord>;
}

/// Event source configuration, selected by its `type` tag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeneratorConfig {
    ParticleGun(ParticleGunConfig),
    Collision(CollisionConfig),
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig::ParticleGun(ParticleGunConfig::default())
    }
}

/// The configured event source.
#[derive(Clone, Debug)]
pub enum EventGenerator {
    ParticleGun(ParticleGun),
    Collision(CollisionGenerator),
}

impl EventGenerator {
    /// Build the source selected by `config`.
    pub fn from_config(config: &GeneratorConfig) -> Result<Self, ConfigError> {
        Ok(match config {
            GeneratorConfig::ParticleGun(config) => {
                EventGenerator::ParticleGun(ParticleGun::new(config.clone())?)
            }
            GeneratorConfig::Collision(config) => {
                EventGenerator::Collision(CollisionGenerator::new(config.clone())?)
            }
        })
    }
}

impl EventSource for EventGenerator {
    fn generate(&self, rng: &mut impl Rng) -> Vec<ParticleRecord> {
        match self {
            EventGenerator::ParticleGun(gun) => gun.generate(rng),
            EventGenerator::Collision(collision) => collision.generate(rng),
        }
    }
}

/// Unit vector for a polar angle and azimuth.
pub(crate) fn direction(theta: f64, phi: f64) -> Vector3<f64> {
    Vector3::new(
        theta.sin() * phi.cos(),
        theta.sin() * phi.sin(),
        theta.cos(),
    )
}
