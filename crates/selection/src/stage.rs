//! Selection stages.

use crate::apply;
use crate::particle::{ParticleCriteria, ParticleSelector};
use crate::track::TrackCriteria;
use tracing::debug;
use tracklab_core::{Collection, ConfigError, EventContext, PipelineResources, Stage, StageError};

/// Filters the current particle collection in place.
///
/// When the criteria constrain the measurement count, the stage also reads
/// measurements and hits to attribute measurements to particles.
pub struct ParticleSelectionStage {
    name: String,
    criteria: ParticleCriteria,
}

impl ParticleSelectionStage {
    pub fn new(name: impl Into<String>, criteria: ParticleCriteria) -> Result<Self, ConfigError> {
        criteria.validate()?;
        Ok(Self {
            name: name.into(),
            criteria,
        })
    }

    pub fn criteria(&self) -> &ParticleCriteria {
        &self.criteria
    }
}

impl Stage for ParticleSelectionStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn reads(&self) -> Vec<Collection> {
        if self.criteria.uses_measurements() {
            vec![
                Collection::Particles,
                Collection::Hits,
                Collection::Measurements,
            ]
        } else {
            vec![Collection::Particles]
        }
    }

    fn writes(&self) -> Vec<Collection> {
        vec![Collection::Particles]
    }

    fn execute(
        &self,
        ctx: &mut EventContext,
        _resources: &PipelineResources,
    ) -> Result<(), StageError> {
        let before = ctx.data.particles.len();
        let counts = self
            .criteria
            .uses_measurements()
            .then(|| ctx.data.measurements_per_particle());
        let selected = apply(
            &ctx.data.particles,
            &ParticleSelector::new(&self.criteria, counts.as_ref()),
        );
        debug!(
            stage = %self.name,
            event = ctx.index().0,
            before,
            after = selected.len(),
            "Selected particles"
        );
        ctx.data.particles = selected;
        Ok(())
    }
}

/// Filters the track collection in place.
pub struct TrackSelectionStage {
    criteria: TrackCriteria,
}

impl TrackSelectionStage {
    pub fn new(criteria: TrackCriteria) -> Result<Self, ConfigError> {
        criteria.validate()?;
        Ok(Self { criteria })
    }
}

impl Stage for TrackSelectionStage {
    fn name(&self) -> &str {
        "track-selection"
    }

    fn reads(&self) -> Vec<Collection> {
        vec![Collection::Tracks]
    }

    fn writes(&self) -> Vec<Collection> {
        vec![Collection::Tracks]
    }

    fn execute(
        &self,
        ctx: &mut EventContext,
        _resources: &PipelineResources,
    ) -> Result<(), StageError> {
        let before = ctx.data.tracks.len();
        ctx.data.tracks = apply(&ctx.data.tracks, &self.criteria);
        debug!(
            event = ctx.index().0,
            before,
            after = ctx.data.tracks.len(),
            "Selected tracks"
        );
        Ok(())
    }
}
