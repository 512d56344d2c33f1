//! Pipeline stage wrapping an event source.

use crate::{EventGenerator, EventSource};
use tracing::debug;
use tracklab_core::{Collection, EventContext, PipelineResources, Stage, StageError};

/// First stage of the chain: fills the generated and current particle
/// collections.
pub struct EventGenerationStage {
    generator: EventGenerator,
}

impl EventGenerationStage {
    pub fn new(generator: EventGenerator) -> Self {
        Self { generator }
    }
}

impl Stage for EventGenerationStage {
    fn name(&self) -> &str {
        "event-generation"
    }

    fn reads(&self) -> Vec<Collection> {
        Vec::new()
    }

    fn writes(&self) -> Vec<Collection> {
        vec![Collection::GeneratedParticles, Collection::Particles]
    }

    fn execute(
        &self,
        ctx: &mut EventContext,
        _resources: &PipelineResources,
    ) -> Result<(), StageError> {
        let mut rng = ctx.random().spawn(self.name());
        let particles = self.generator.generate(&mut rng);
        debug!(
            event = ctx.index().0,
            particles = particles.len(),
            "Generated particles"
        );
        ctx.data.generated_particles = particles.clone();
        ctx.data.particles = particles;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GeneratorConfig, ParticleGunConfig};
    use std::sync::Arc;
    use tracklab_detector::{ConstantField, DetectorGeometry};
    use tracklab_types::EventIndex;

    #[test]
    fn test_stage_fills_both_particle_collections() {
        let resources = PipelineResources::new(
            Arc::new(DetectorGeometry::generic().unwrap()),
            Arc::new(ConstantField::solenoid(2.0)),
            42,
        );
        let generator = EventGenerator::from_config(&GeneratorConfig::ParticleGun(
            ParticleGunConfig::default().with_count(3),
        ))
        .unwrap();
        let stage = EventGenerationStage::new(generator);

        let index = EventIndex(4);
        let mut ctx = EventContext::new(index, resources.random.event_stream(index));
        stage.execute(&mut ctx, &resources).unwrap();
        assert_eq!(ctx.data.generated_particles.len(), 3);
        assert_eq!(ctx.data.generated_particles, ctx.data.particles);

        let mut again = EventContext::new(index, resources.random.event_stream(index));
        stage.execute(&mut again, &resources).unwrap();
        assert_eq!(ctx.data, again.data);
    }
}
