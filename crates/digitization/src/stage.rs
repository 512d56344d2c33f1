//! Digitization stage.

use crate::config::{SmearingConfig, SmearingMap};
use crate::digitizer::{digitize, DigitizationError};
use tracing::{debug, info};
use tracklab_core::{Collection, ConfigError, EventContext, PipelineResources, Stage, StageError};

/// Converts simulated hits into smeared measurements.
pub struct DigitizationStage {
    smearing: SmearingMap,
}

impl DigitizationStage {
    pub fn new(config: &SmearingConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            smearing: SmearingMap::new(config)?,
        })
    }
}

impl Stage for DigitizationStage {
    fn name(&self) -> &str {
        "digitization"
    }

    fn reads(&self) -> Vec<Collection> {
        vec![Collection::Hits]
    }

    fn writes(&self) -> Vec<Collection> {
        vec![Collection::Measurements]
    }

    /// Every sensitive surface must have a smearing entry.
    fn initialize(&self, resources: &PipelineResources) -> Result<(), ConfigError> {
        let surfaces = resources.geometry.sensitive_surfaces();
        if let Some(surface) = surfaces
            .iter()
            .find(|s| self.smearing.lookup(s.id()).is_none())
        {
            return Err(ConfigError::MissingSmearing {
                surface: surface.id().to_string(),
            });
        }
        info!(
            surfaces = surfaces.len(),
            merge_distance = self.smearing.merge_distance(),
            "Digitization configured"
        );
        Ok(())
    }

    fn execute(
        &self,
        ctx: &mut EventContext,
        resources: &PipelineResources,
    ) -> Result<(), StageError> {
        let mut rng = ctx.random().spawn(self.name());
        let measurements = digitize(
            &ctx.data.hits,
            resources.geometry.as_ref(),
            &self.smearing,
            &mut rng,
        )
        .map_err(|e| match e {
            DigitizationError::MissingSmearing(surface) => StageError::Configuration {
                stage: self.name().to_string(),
                source: ConfigError::MissingSmearing {
                    surface: surface.to_string(),
                },
            },
            other => StageError::processing(self.name(), other),
        })?;
        debug!(
            event = ctx.index().0,
            hits = ctx.data.hits.len(),
            measurements = measurements.len(),
            "Digitized hits"
        );
        ctx.data.measurements = measurements;
        Ok(())
    }
}
