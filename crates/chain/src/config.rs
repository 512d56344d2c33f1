//! Run configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracklab_core::ConfigError;
use tracklab_digitization::SmearingConfig;
use tracklab_fatras::FatrasConfig;
use tracklab_generation::GeneratorConfig;
use tracklab_seeding::SeedingConfig;
use tracklab_selection::{ParticleCriteria, TrackCriteria};
use tracklab_tracking::TrackFindingConfig;

/// Everything needed to run the chain, loadable from TOML.
///
/// Selections are optional; an absent selection stage is not added to the
/// pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub events: u64,
    /// 1 runs sequentially, 0 uses all cores.
    pub workers: usize,
    pub seed: u64,
    /// Index of the first event.
    pub skip: u64,
    pub output: OutputConfig,
    pub detector: DetectorSource,
    pub field: FieldConfig,
    pub generator: GeneratorConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator_selection: Option<ParticleCriteria>,
    pub fatras: FatrasConfig,
    pub digitization: DigitizationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digitization_selection: Option<ParticleCriteria>,
    pub seeding: SeedingConfig,
    pub tracking: TrackFindingConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_selection: Option<TrackCriteria>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            events: 10,
            workers: 1,
            seed: 42,
            skip: 0,
            output: OutputConfig::default(),
            detector: DetectorSource::default(),
            field: FieldConfig::default(),
            generator: GeneratorConfig::default(),
            generator_selection: None,
            fatras: FatrasConfig::default(),
            digitization: DigitizationConfig::default(),
            digitization_selection: None,
            seeding: SeedingConfig::default(),
            tracking: TrackFindingConfig::default(),
            track_selection: None,
        }
    }
}

impl RunConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        toml::from_str(input).map_err(|e| ConfigError::Parse {
            what: "run configuration".to_string(),
            reason: e.to_string(),
        })
    }

    /// Load a run configuration. Relative table and resource paths are
    /// taken relative to the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_toml_str(&ConfigError::read_file(path)?)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            what: "run configuration".to_string(),
            reason: e.to_string(),
        })
    }

    pub fn with_events(mut self, events: u64) -> Self {
        self.events = events;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_output_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.output.directory = Some(directory.into());
        self
    }

    pub fn with_generator(mut self, generator: GeneratorConfig) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_smearing(mut self, smearing: SmearingConfig) -> Self {
        self.digitization.smearing = Some(smearing);
        self
    }

    pub fn with_seeding(mut self, seeding: SeedingConfig) -> Self {
        self.seeding = seeding;
        self
    }

    pub fn with_track_selection(mut self, criteria: TrackCriteria) -> Self {
        self.track_selection = Some(criteria);
        self
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut Option<PathBuf>| {
            if let Some(p) = path.as_mut().filter(|p| p.is_relative()) {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.detector.file);
        resolve(&mut self.digitization.smearing_file);
        resolve(&mut self.seeding.tables.geometry_selection);
        resolve(&mut self.seeding.tables.layer_mapping);
        resolve(&mut self.seeding.tables.connector);
        if let FieldConfig::Map { file } = &mut self.field {
            if file.is_relative() {
                *file = base.join(&*file);
            }
        }
        if let Some(directory) = self.output.directory.as_mut().filter(|d| d.is_relative()) {
            *directory = base.join(&*directory);
        }
    }
}

/// Per-event JSON output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// No files are written when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    pub hits: bool,
    pub space_points: bool,
}

/// Detector description; the built-in generic detector when no file is
/// given.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

/// Magnetic field, selected by its `type` tag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldConfig {
    /// Uniform solenoid field along z, in T.
    Constant { bz: f64 },
    /// r–z field map in CSV.
    Map { file: PathBuf },
}

impl Default for FieldConfig {
    fn default() -> Self {
        FieldConfig::Constant { bz: 2.0 }
    }
}

/// Smearing for the digitization stage, inline or from a JSON file.
///
/// Without either, the generic detector's resolutions are used.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigitizationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smearing_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smearing: Option<SmearingConfig>,
}

impl DigitizationConfig {
    /// The inline smearing, or the contents of the smearing file.
    pub fn smearing(&self) -> Result<SmearingConfig, ConfigError> {
        match (&self.smearing, &self.smearing_file) {
            (Some(_), Some(_)) => Err(ConfigError::invalid(
                "digitization",
                "give either smearing or smearing_file, not both",
            )),
            (Some(smearing), None) => Ok(smearing.clone()),
            (None, Some(path)) => SmearingConfig::load(path),
            (None, None) => Ok(SmearingConfig::generic()),
        }
    }
}
