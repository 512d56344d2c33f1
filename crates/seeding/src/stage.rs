//! Seeding stage.

use crate::space_point::space_points;
use crate::{find_seeds, SeedingAlgorithm, SeedingInput};
use tracing::debug;
use tracklab_core::{Collection, EventContext, PipelineResources, Stage, StageError};

/// Builds space points from the event's measurements and finds seeds.
pub struct SeedingStage {
    algorithm: SeedingAlgorithm,
}

impl SeedingStage {
    pub fn new(algorithm: SeedingAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> &SeedingAlgorithm {
        &self.algorithm
    }
}

impl Stage for SeedingStage {
    fn name(&self) -> &str {
        "seeding"
    }

    fn reads(&self) -> Vec<Collection> {
        let mut reads = vec![Collection::Measurements];
        if self.algorithm.uses_truth() {
            reads.extend([Collection::Particles, Collection::Hits]);
        }
        reads
    }

    fn writes(&self) -> Vec<Collection> {
        vec![Collection::SpacePoints, Collection::Seeds]
    }

    fn execute(
        &self,
        ctx: &mut EventContext,
        resources: &PipelineResources,
    ) -> Result<(), StageError> {
        let points = space_points(&ctx.data.measurements, resources.geometry.as_ref());
        let seeds = find_seeds(
            &self.algorithm,
            &SeedingInput {
                measurements: &ctx.data.measurements,
                space_points: &points,
                particles: &ctx.data.particles,
                hits: &ctx.data.hits,
                bz: resources.central_bz(),
            },
        );

        let n_measurements = ctx.data.measurements.len();
        if let Some(seed) = seeds
            .iter()
            .find(|s| s.measurements().iter().any(|m| m.as_usize() >= n_measurements))
        {
            return Err(StageError::processing(
                self.name(),
                format!("seed in {} references a missing measurement", seed.region()),
            ));
        }

        debug!(
            event = ctx.index().0,
            algorithm = %self.algorithm.tag(),
            space_points = points.len(),
            seeds = seeds.len(),
            "Found seeds"
        );
        ctx.data.space_points = points;
        ctx.data.seeds = seeds;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SeedingAlgorithmTag, TripletSeedingConfig, TruthSeedingConfig};
    use std::sync::Arc;
    use tracing_test::traced_test;
    use tracklab_detector::{ConstantField, DetectorGeometry};
    use tracklab_test_helpers::straight_track_measurements;
    use tracklab_types::EventIndex;

    fn resources() -> PipelineResources {
        PipelineResources::new(
            Arc::new(DetectorGeometry::generic().unwrap()),
            Arc::new(ConstantField::solenoid(2.0)),
            11,
        )
    }

    #[test]
    fn test_truth_seeding_declares_truth_inputs() {
        let stage = SeedingStage::new(SeedingAlgorithm::TruthEstimated(
            TruthSeedingConfig::default(),
        ));
        assert_eq!(
            stage.reads(),
            vec![Collection::Measurements, Collection::Particles, Collection::Hits]
        );
        let stage = SeedingStage::new(SeedingAlgorithm::Default(TripletSeedingConfig::default()));
        assert_eq!(stage.reads(), vec![Collection::Measurements]);
        assert_eq!(stage.algorithm().tag(), SeedingAlgorithmTag::Default);
    }

    #[traced_test]
    #[test]
    fn test_stage_writes_space_points_and_seeds() {
        let resources = resources();
        let stage = SeedingStage::new(SeedingAlgorithm::Default(TripletSeedingConfig::default()));
        let index = EventIndex(4);
        let mut ctx = EventContext::new(index, resources.random.event_stream(index));
        ctx.data.measurements =
            straight_track_measurements(resources.geometry.as_ref(), 0.4, 0.3, 4.0);

        stage.execute(&mut ctx, &resources).unwrap();
        assert_eq!(ctx.data.space_points.len(), ctx.data.measurements.len());
        assert!(!ctx.data.seeds.is_empty());
        for seed in &ctx.data.seeds {
            for m in seed.measurements() {
                assert!(m.as_usize() < ctx.data.measurements.len());
            }
        }
        assert!(logs_contain("Found seeds"));
    }
}
