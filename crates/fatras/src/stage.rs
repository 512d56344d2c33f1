//! Fast simulation stage.

use crate::config::FatrasConfig;
use crate::simulation::propagate;
use tracing::debug;
use tracklab_core::{Collection, ConfigError, EventContext, PipelineResources, Stage, StageError};

/// Simulates the selected particles and writes their hits.
pub struct FatrasStage {
    config: FatrasConfig,
}

impl FatrasStage {
    pub fn new(config: FatrasConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl Stage for FatrasStage {
    fn name(&self) -> &str {
        "fatras"
    }

    fn reads(&self) -> Vec<Collection> {
        vec![Collection::Particles]
    }

    fn writes(&self) -> Vec<Collection> {
        vec![Collection::Hits]
    }

    fn execute(
        &self,
        ctx: &mut EventContext,
        resources: &PipelineResources,
    ) -> Result<(), StageError> {
        let hits = propagate(
            &ctx.data.particles,
            resources.geometry.as_ref(),
            resources.field.as_ref(),
            ctx.random(),
            &self.config,
        );
        debug!(
            event = ctx.index().0,
            particles = ctx.data.particles.len(),
            hits = hits.len(),
            "Simulated hits"
        );
        ctx.data.hits = hits;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tracing_test::traced_test;
    use tracklab_detector::{ConstantField, DetectorGeometry};
    use tracklab_types::{EventIndex, ParticleId, ParticleRecord, Provenance, Vector3};

    #[test]
    fn test_invalid_config_rejected() {
        let config = FatrasConfig::default().with_pt_min(-1.0);
        assert!(FatrasStage::new(config).is_err());
    }

    #[traced_test]
    #[test]
    fn test_stage_writes_hits() {
        let resources = PipelineResources::new(
            Arc::new(DetectorGeometry::generic().unwrap()),
            Arc::new(ConstantField::solenoid(2.0)),
            3,
        );
        let stage = FatrasStage::new(FatrasConfig::default()).unwrap();
        let index = EventIndex(1);
        let mut ctx = EventContext::new(index, resources.random.event_stream(index));
        ctx.data.particles = vec![ParticleRecord {
            id: ParticleId::new(1, 0),
            pdg: -13,
            charge: 1.0,
            mass: 0.105_658_4,
            momentum: Vector3::new(3.0, -2.0, 1.0),
            vertex: Vector3::zeros(),
            time: 0.0,
            provenance: Provenance::HardScatter,
        }];

        stage.execute(&mut ctx, &resources).unwrap();
        assert!(ctx.data.hits.len() >= 8);
        assert!(logs_contain("Simulated hits"));
    }
}
