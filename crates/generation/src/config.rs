//! Configuration types for event sources.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracklab_core::random::{sample_gaussian, sample_poisson, sample_uniform};
use tracklab_core::ConfigError;
use tracklab_types::kinematics::{theta_from_eta, MUON_MASS};
use tracklab_types::Vector3;

/// How many items (particles, interactions) to produce.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Multiplicity {
    /// Always the same count.
    Fixed { count: u32 },

    /// Uniform integer in `[min, max]`.
    Uniform { min: u32, max: u32 },

    /// Poisson-distributed count.
    Poisson { mean: f64 },
}

impl Multiplicity {
    pub fn validate(&self, parameter: &str) -> Result<(), ConfigError> {
        match *self {
            Multiplicity::Fixed { .. } => Ok(()),
            Multiplicity::Uniform { min, max } => {
                ConfigError::check_range(parameter, f64::from(min), f64::from(max))
            }
            Multiplicity::Poisson { mean } => {
                if mean.is_finite() && mean >= 0.0 {
                    Ok(())
                } else {
                    Err(ConfigError::invalid(
                        parameter,
                        format!("mean must be finite and non-negative, got {mean}"),
                    ))
                }
            }
        }
    }

    pub fn sample(&self, rng: &mut impl Rng) -> u32 {
        match *self {
            Multiplicity::Fixed { count } => count,
            Multiplicity::Uniform { min, max } => rng.gen_range(min..=max),
            Multiplicity::Poisson { mean } => {
                u32::try_from(sample_poisson(rng, mean)).unwrap_or(u32::MAX)
            }
        }
    }
}

/// Momentum range in GeV.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumConfig {
    pub min: f64,
    pub max: f64,

    /// Whether the range applies to the transverse momentum instead of the
    /// absolute momentum.
    pub transverse: bool,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            min: 1.0,
            max: 10.0,
            transverse: true,
        }
    }
}

impl MomentumConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_range("momentum", self.min, self.max)?;
        if self.min <= 0.0 {
            return Err(ConfigError::invalid("momentum", "minimum must be positive"));
        }
        Ok(())
    }
}

/// Pseudorapidity range.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtaConfig {
    pub min: f64,
    pub max: f64,

    /// Sample uniformly in pseudorapidity; otherwise uniformly in the polar
    /// angle covering the same range.
    pub uniform: bool,
}

impl Default for EtaConfig {
    fn default() -> Self {
        Self {
            min: -4.0,
            max: 4.0,
            uniform: true,
        }
    }
}

impl EtaConfig {
    pub fn symmetric(max: f64) -> Self {
        Self {
            min: -max,
            max,
            uniform: true,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_range("eta", self.min, self.max)?;
        if !(self.min.is_finite() && self.max.is_finite()) {
            return Err(ConfigError::invalid("eta", "bounds must be finite"));
        }
        Ok(())
    }

    /// Sample a polar angle.
    pub(crate) fn sample_theta(&self, rng: &mut impl Rng) -> f64 {
        if self.uniform {
            theta_from_eta(sample_uniform(rng, self.min, self.max))
        } else {
            // theta decreases with eta.
            sample_uniform(rng, theta_from_eta(self.max), theta_from_eta(self.min))
        }
    }
}

/// Azimuth range in radians.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhiConfig {
    pub min: f64,
    pub max: f64,
}

impl Default for PhiConfig {
    fn default() -> Self {
        Self { min: -PI, max: PI }
    }
}

impl PhiConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_range("phi", self.min, self.max)
    }
}

/// Species of the generated particles.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    /// PDG code for the configured charge sign.
    pub pdg: i32,
    /// Mass in GeV.
    pub mass: f64,
    /// Charge in units of e.
    pub charge: f64,
    /// Flip the charge (and PDG code) with probability one half.
    pub randomize_charge: bool,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            pdg: 13,
            mass: MUON_MASS,
            charge: -1.0,
            randomize_charge: true,
        }
    }
}

/// Where particles are produced, as (x, y, z, t) in mm and ns.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VertexConfig {
    Fixed { position: [f64; 4] },
    Gaussian { mean: [f64; 4], std_dev: [f64; 4] },
}

impl Default for VertexConfig {
    fn default() -> Self {
        VertexConfig::Fixed {
            position: [0.0; 4],
        }
    }
}

impl VertexConfig {
    /// Beam-spot smearing of a high-luminosity hadron collider.
    pub fn beam_spot() -> Self {
        VertexConfig::Gaussian {
            mean: [0.0; 4],
            std_dev: [0.0125, 0.0125, 55.5, 5.0],
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let VertexConfig::Gaussian { std_dev, .. } = self {
            if std_dev.iter().any(|s| !(s.is_finite() && *s >= 0.0)) {
                return Err(ConfigError::invalid(
                    "vertex",
                    "standard deviations must be finite and non-negative",
                ));
            }
        }
        Ok(())
    }

    /// Sample a production point and time.
    pub fn sample(&self, rng: &mut impl Rng) -> (Vector3<f64>, f64) {
        match *self {
            VertexConfig::Fixed { position } => {
                (Vector3::new(position[0], position[1], position[2]), position[3])
            }
            VertexConfig::Gaussian { mean, std_dev } => {
                let mut v = [0.0; 4];
                for (i, value) in v.iter_mut().enumerate() {
                    *value = sample_gaussian(rng, mean[i], std_dev[i]);
                }
                (Vector3::new(v[0], v[1], v[2]), v[3])
            }
        }
    }
}

/// Configuration for the single-particle gun.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleGunConfig {
    pub multiplicity: Multiplicity,
    pub momentum: MomentumConfig,
    pub eta: EtaConfig,
    pub phi: PhiConfig,
    pub particle: ParticleConfig,
    pub vertex: VertexConfig,
}

impl Default for ParticleGunConfig {
    fn default() -> Self {
        Self {
            multiplicity: Multiplicity::Fixed { count: 2 },
            momentum: MomentumConfig::default(),
            eta: EtaConfig::default(),
            phi: PhiConfig::default(),
            particle: ParticleConfig::default(),
            vertex: VertexConfig::default(),
        }
    }
}

impl ParticleGunConfig {
    /// Set a fixed number of particles per event.
    pub fn with_count(mut self, count: u32) -> Self {
        self.multiplicity = Multiplicity::Fixed { count };
        self
    }

    /// Set the multiplicity distribution.
    pub fn with_multiplicity(mut self, multiplicity: Multiplicity) -> Self {
        self.multiplicity = multiplicity;
        self
    }

    /// Set the momentum range.
    pub fn with_momentum(mut self, min: f64, max: f64, transverse: bool) -> Self {
        self.momentum = MomentumConfig {
            min,
            max,
            transverse,
        };
        self
    }

    /// Set a pseudorapidity range, uniform in eta.
    pub fn with_eta(mut self, min: f64, max: f64) -> Self {
        self.eta = EtaConfig {
            min,
            max,
            uniform: true,
        };
        self
    }

    /// Set the azimuth range.
    pub fn with_phi(mut self, min: f64, max: f64) -> Self {
        self.phi = PhiConfig { min, max };
        self
    }

    /// Set the particle species.
    pub fn with_particle(mut self, particle: ParticleConfig) -> Self {
        self.particle = particle;
        self
    }

    /// Set the vertex distribution.
    pub fn with_vertex(mut self, vertex: VertexConfig) -> Self {
        self.vertex = vertex;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.multiplicity.validate("particle gun multiplicity")?;
        self.momentum.validate()?;
        self.eta.validate()?;
        self.phi.validate()?;
        if !(self.particle.mass.is_finite() && self.particle.mass >= 0.0) {
            return Err(ConfigError::invalid("particle mass", "must be non-negative"));
        }
        self.vertex.validate()
    }
}

/// Particle content of one interaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub multiplicity: Multiplicity,

    /// Lowest transverse momentum produced, in GeV.
    pub pt_min: f64,

    /// Mean of the exponential spectrum above `pt_min`, in GeV.
    pub pt_mean: f64,

    pub eta: EtaConfig,

    /// Fraction of neutral particles.
    pub neutral_fraction: f64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self::minimum_bias()
    }
}

impl InteractionConfig {
    /// Soft inelastic interaction.
    pub fn minimum_bias() -> Self {
        Self {
            multiplicity: Multiplicity::Poisson { mean: 30.0 },
            pt_min: 0.1,
            pt_mean: 0.5,
            eta: EtaConfig::symmetric(5.0),
            neutral_fraction: 0.35,
        }
    }

    /// Hard interaction with a harder spectrum and more particles.
    pub fn hard_scatter() -> Self {
        Self {
            multiplicity: Multiplicity::Poisson { mean: 80.0 },
            pt_min: 0.15,
            pt_mean: 3.0,
            eta: EtaConfig::symmetric(4.0),
            neutral_fraction: 0.35,
        }
    }

    pub fn validate(&self, parameter: &str) -> Result<(), ConfigError> {
        self.multiplicity.validate(parameter)?;
        if !(self.pt_min >= 0.0 && self.pt_mean > 0.0) {
            return Err(ConfigError::invalid(
                parameter,
                "pt_min must be non-negative and pt_mean positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.neutral_fraction) {
            return Err(ConfigError::invalid(
                parameter,
                format!("neutral fraction {} outside [0, 1]", self.neutral_fraction),
            ));
        }
        self.eta.validate()
    }
}

/// Configuration for a collision with pile-up.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    pub hard_scatter: InteractionConfig,

    /// Number of additional pile-up interactions.
    pub pile_up: Multiplicity,

    pub pile_up_interaction: InteractionConfig,

    /// Distribution of interaction vertices.
    pub vertex: VertexConfig,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            hard_scatter: InteractionConfig::hard_scatter(),
            pile_up: Multiplicity::Fixed { count: 200 },
            pile_up_interaction: InteractionConfig::minimum_bias(),
            vertex: VertexConfig::beam_spot(),
        }
    }
}

impl CollisionConfig {
    /// Set a fixed pile-up count.
    pub fn with_pile_up(mut self, count: u32) -> Self {
        self.pile_up = Multiplicity::Fixed { count };
        self
    }

    /// Set the pile-up distribution.
    pub fn with_pile_up_distribution(mut self, pile_up: Multiplicity) -> Self {
        self.pile_up = pile_up;
        self
    }

    /// Set the hard-scatter content.
    pub fn with_hard_scatter(mut self, interaction: InteractionConfig) -> Self {
        self.hard_scatter = interaction;
        self
    }

    /// Set the pile-up content.
    pub fn with_pile_up_interaction(mut self, interaction: InteractionConfig) -> Self {
        self.pile_up_interaction = interaction;
        self
    }

    /// Set the vertex distribution.
    pub fn with_vertex(mut self, vertex: VertexConfig) -> Self {
        self.vertex = vertex;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.hard_scatter.validate("hard scatter")?;
        self.pile_up.validate("pile-up count")?;
        self.pile_up_interaction.validate("pile-up interaction")?;
        self.vertex.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_inverted_momentum_range_rejected() {
        let config = ParticleGunConfig::default().with_momentum(10.0, 1.0, true);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_inverted_eta_range_rejected() {
        let config = ParticleGunConfig::default().with_eta(4.0, -4.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_negative_pile_up_rejected() {
        let config = CollisionConfig::default()
            .with_pile_up_distribution(Multiplicity::Poisson { mean: -1.0 });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_multiplicity_sampling() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(Multiplicity::Fixed { count: 4 }.sample(&mut rng), 4);
        for _ in 0..100 {
            let n = Multiplicity::Uniform { min: 2, max: 5 }.sample(&mut rng);
            assert!((2..=5).contains(&n));
        }
        assert!(Multiplicity::Uniform { min: 5, max: 2 }
            .validate("test")
            .is_err());
    }

    #[test]
    fn test_theta_sampling_stays_in_eta_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let eta = EtaConfig {
            min: 1.0,
            max: 2.0,
            uniform: false,
        };
        for _ in 0..200 {
            let theta = eta.sample_theta(&mut rng);
            assert!(theta <= theta_from_eta(1.0) && theta >= theta_from_eta(2.0));
        }
    }

    #[test]
    fn test_fixed_vertex() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let (position, time) = VertexConfig::Fixed {
            position: [1.0, 2.0, 3.0, 4.0],
        }
        .sample(&mut rng);
        assert_eq!(position, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(time, 4.0);
    }
}
