//! Seed finding for tracklab.
//!
//! Measurements are promoted to space points and grouped into seeds of
//! three or four measurements by one of three algorithms:
//!
//! | Tag               | Algorithm                                            |
//! |-------------------|------------------------------------------------------|
//! | `default`         | Bottom-middle-top triplets with kinematic cuts       |
//! | `truth_estimated` | Innermost measurements of each selected particle     |
//! | `gbts`            | Graph of segments between table-connected layers     |
//!
//! The algorithm is chosen once from [`SeedingConfig`]; everything it
//! needs (cuts, lookup tables) is bundled into its [`SeedingAlgorithm`]
//! case when the pipeline is built.

pub mod gbts;
mod space_point;
mod stage;
mod triplet;
mod truth;

pub use gbts::{GbtsConfig, GbtsSeeding, GbtsTablePaths, GbtsTables};
pub use space_point::space_points;
pub use stage::SeedingStage;
pub use triplet::{find_triplet_seeds, TripletSeedingConfig};
pub use truth::{find_truth_seeds, TruthSeedingConfig};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracklab_core::ConfigError;
use tracklab_detector::TrackingGeometry;
use tracklab_types::{Measurement, ParticleRecord, Seed, SimulatedHit, SpacePoint};

/// Names of the seeding algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeedingAlgorithmTag {
    Default,
    TruthEstimated,
    Gbts,
}

impl FromStr for SeedingAlgorithmTag {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(SeedingAlgorithmTag::Default),
            "truth_estimated" => Ok(SeedingAlgorithmTag::TruthEstimated),
            "gbts" => Ok(SeedingAlgorithmTag::Gbts),
            other => Err(ConfigError::UnknownVariant {
                kind: "seeding algorithm".to_string(),
                tag: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for SeedingAlgorithmTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SeedingAlgorithmTag::Default => "default",
            SeedingAlgorithmTag::TruthEstimated => "truth_estimated",
            SeedingAlgorithmTag::Gbts => "gbts",
        })
    }
}

/// Seeding section of the run configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedingConfig {
    /// One of `default`, `truth_estimated` or `gbts`.
    pub algorithm: String,
    pub triplet: TripletSeedingConfig,
    pub truth: TruthSeedingConfig,
    pub gbts: GbtsConfig,
    pub tables: GbtsTablePaths,
}

impl Default for SeedingConfig {
    fn default() -> Self {
        Self {
            algorithm: SeedingAlgorithmTag::Default.to_string(),
            triplet: TripletSeedingConfig::default(),
            truth: TruthSeedingConfig::default(),
            gbts: GbtsConfig::default(),
            tables: GbtsTablePaths::default(),
        }
    }
}

impl SeedingConfig {
    pub fn with_algorithm(mut self, tag: SeedingAlgorithmTag) -> Self {
        self.algorithm = tag.to_string();
        self
    }

    pub fn with_tables(mut self, tables: GbtsTablePaths) -> Self {
        self.tables = tables;
        self
    }

    pub fn tag(&self) -> Result<SeedingAlgorithmTag, ConfigError> {
        self.algorithm.parse()
    }
}

/// A configured seeding algorithm.
#[derive(Debug)]
pub enum SeedingAlgorithm {
    Default(TripletSeedingConfig),
    TruthEstimated(TruthSeedingConfig),
    Gbts(Box<GbtsSeeding>),
}

impl SeedingAlgorithm {
    /// Validate the selected algorithm's configuration and load its tables.
    pub fn from_config(
        config: &SeedingConfig,
        geometry: &dyn TrackingGeometry,
    ) -> Result<Self, ConfigError> {
        match config.tag()? {
            SeedingAlgorithmTag::Default => {
                config.triplet.validate()?;
                Ok(SeedingAlgorithm::Default(config.triplet.clone()))
            }
            SeedingAlgorithmTag::TruthEstimated => {
                config.truth.validate()?;
                Ok(SeedingAlgorithm::TruthEstimated(config.truth.clone()))
            }
            SeedingAlgorithmTag::Gbts => {
                config.gbts.validate()?;
                let tables = GbtsTables::load(&config.tables)?;
                let seeding = GbtsSeeding::build(config.gbts.clone(), tables, geometry)?;
                Ok(SeedingAlgorithm::Gbts(Box::new(seeding)))
            }
        }
    }

    pub fn tag(&self) -> SeedingAlgorithmTag {
        match self {
            SeedingAlgorithm::Default(_) => SeedingAlgorithmTag::Default,
            SeedingAlgorithm::TruthEstimated(_) => SeedingAlgorithmTag::TruthEstimated,
            SeedingAlgorithm::Gbts(_) => SeedingAlgorithmTag::Gbts,
        }
    }

    /// Whether the algorithm needs truth particles and hits.
    pub fn uses_truth(&self) -> bool {
        matches!(self, SeedingAlgorithm::TruthEstimated(_))
    }
}

/// Event data available to the seed finders.
#[derive(Debug, Clone, Copy)]
pub struct SeedingInput<'a> {
    pub measurements: &'a [Measurement],
    pub space_points: &'a [SpacePoint],
    pub particles: &'a [ParticleRecord],
    pub hits: &'a [SimulatedHit],
    /// Longitudinal field in T.
    pub bz: f64,
}

/// Run the configured algorithm on one event.
pub fn find_seeds(algorithm: &SeedingAlgorithm, input: &SeedingInput<'_>) -> Vec<Seed> {
    match algorithm {
        SeedingAlgorithm::Default(config) => {
            find_triplet_seeds(input.space_points, config, input.bz)
        }
        SeedingAlgorithm::TruthEstimated(config) => {
            find_truth_seeds(input.particles, input.hits, input.measurements, config)
        }
        SeedingAlgorithm::Gbts(seeding) => seeding.find_seeds(input.space_points, input.bz),
    }
}
