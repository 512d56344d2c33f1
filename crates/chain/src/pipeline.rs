//! Assembling the stage list from a run configuration.

use crate::config::{FieldConfig, RunConfig};
use crate::error::ChainError;
use std::sync::Arc;
use tracing::info;
use tracklab_core::{PipelineResources, Stage};
use tracklab_detector::{
    ConstantField, DetectorConfig, DetectorGeometry, MagneticField, RzFieldMap, TrackingGeometry,
};
use tracklab_digitization::DigitizationStage;
use tracklab_fatras::FatrasStage;
use tracklab_generation::{EventGenerationStage, EventGenerator};
use tracklab_seeding::{SeedingAlgorithm, SeedingStage};
use tracklab_selection::{ParticleSelectionStage, TrackSelectionStage};
use tracklab_sequencer::{JsonEventWriter, RunSummary, Sequencer};
use tracklab_tracking::TrackFindingStage;

/// Load the detector geometry and magnetic field.
pub fn load_resources(config: &RunConfig) -> Result<PipelineResources, ChainError> {
    let geometry: Arc<dyn TrackingGeometry> = match &config.detector.file {
        Some(path) => Arc::new(DetectorGeometry::build(&DetectorConfig::load(path)?)?),
        None => Arc::new(DetectorGeometry::generic()?),
    };
    let field: Arc<dyn MagneticField> = match &config.field {
        FieldConfig::Constant { bz } => Arc::new(ConstantField::solenoid(*bz)),
        FieldConfig::Map { file } => Arc::new(RzFieldMap::load(file)?),
    };
    info!(
        geometry = geometry.name(),
        layers = geometry.layers().len(),
        "Loaded detector"
    );
    Ok(PipelineResources::new(geometry, field, config.seed))
}

/// Stages in chain order: generation, optional selection, simulation,
/// digitization, optional selection, seeding, tracking, optional track
/// selection.
pub fn build_stages(
    config: &RunConfig,
    resources: &PipelineResources,
) -> Result<Vec<Box<dyn Stage>>, ChainError> {
    let mut stages: Vec<Box<dyn Stage>> = Vec::new();

    stages.push(Box::new(EventGenerationStage::new(
        EventGenerator::from_config(&config.generator)?,
    )));
    if let Some(criteria) = &config.generator_selection {
        stages.push(Box::new(ParticleSelectionStage::new(
            "generator-selection",
            criteria.clone(),
        )?));
    }

    stages.push(Box::new(FatrasStage::new(config.fatras.clone())?));
    stages.push(Box::new(DigitizationStage::new(
        &config.digitization.smearing()?,
    )?));
    if let Some(criteria) = &config.digitization_selection {
        stages.push(Box::new(ParticleSelectionStage::new(
            "digitization-selection",
            criteria.clone(),
        )?));
    }

    let seeding = SeedingAlgorithm::from_config(&config.seeding, resources.geometry.as_ref())?;
    stages.push(Box::new(SeedingStage::new(seeding)));
    stages.push(Box::new(TrackFindingStage::new(config.tracking.clone())?));
    if let Some(criteria) = &config.track_selection {
        stages.push(Box::new(TrackSelectionStage::new(criteria.clone())?));
    }
    Ok(stages)
}

/// Build the validated sequencer for a run, with its JSON writer if an
/// output directory is configured.
pub fn build_sequencer(config: &RunConfig) -> Result<Sequencer, ChainError> {
    let resources = load_resources(config)?;
    let stages = build_stages(config, &resources)?;
    let mut sequencer = Sequencer::build(Arc::new(resources), stages)?.with_skip(config.skip);

    if let Some(directory) = &config.output.directory {
        let writer = JsonEventWriter::new(directory.clone())?
            .with_hits(config.output.hits)
            .with_space_points(config.output.space_points);
        info!(directory = %directory.display(), "Writing events");
        sequencer.add_writer(Box::new(writer));
    }
    Ok(sequencer)
}

/// Build and run the chain.
pub fn run(config: &RunConfig) -> Result<RunSummary, ChainError> {
    let sequencer = build_sequencer(config)?;
    Ok(sequencer.run(config.events, config.workers)?)
}
