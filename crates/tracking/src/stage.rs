//! Track finding stage.

use crate::config::TrackFindingConfig;
use crate::finder::find_tracks;
use tracing::debug;
use tracklab_core::{
    Collection, ConfigError, EventContext, PipelineResources, Stage, StageError,
};

/// Extends the event's seeds into tracks.
pub struct TrackFindingStage {
    config: TrackFindingConfig,
}

impl TrackFindingStage {
    pub fn new(config: TrackFindingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrackFindingConfig {
        &self.config
    }
}

impl Stage for TrackFindingStage {
    fn name(&self) -> &str {
        "tracking"
    }

    fn reads(&self) -> Vec<Collection> {
        vec![Collection::Seeds, Collection::Measurements]
    }

    fn writes(&self) -> Vec<Collection> {
        vec![Collection::Tracks]
    }

    fn execute(
        &self,
        ctx: &mut EventContext,
        resources: &PipelineResources,
    ) -> Result<(), StageError> {
        let tracks = find_tracks(
            &ctx.data.seeds,
            &ctx.data.measurements,
            resources.geometry.as_ref(),
            resources.field.as_ref(),
            &self.config,
        );
        debug!(
            event = ctx.index().0,
            seeds = ctx.data.seeds.len(),
            tracks = tracks.len(),
            "Found tracks"
        );
        ctx.data.tracks = tracks;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tracing_test::traced_test;
    use tracklab_detector::{ConstantField, DetectorGeometry};
    use tracklab_test_helpers::helix_track_measurements;
    use tracklab_types::{EventIndex, MeasurementIndex, RegionId, Seed};

    #[test]
    fn test_invalid_config_rejected() {
        let config = TrackFindingConfig::default().with_min_measurements(1);
        assert!(TrackFindingStage::new(config).is_err());
    }

    #[traced_test]
    #[test]
    fn test_stage_writes_tracks() {
        let resources = PipelineResources::new(
            Arc::new(DetectorGeometry::generic().unwrap()),
            Arc::new(ConstantField::solenoid(2.0)),
            5,
        );
        let stage = TrackFindingStage::new(TrackFindingConfig::default()).unwrap();
        assert_eq!(stage.reads(), vec![Collection::Seeds, Collection::Measurements]);

        let index = EventIndex(0);
        let mut ctx = EventContext::new(index, resources.random.event_stream(index));
        ctx.data.measurements = helix_track_measurements(
            resources.geometry.as_ref(),
            2.0,
            3.0,
            -0.4,
            1.1,
            1.0,
            0.0,
            0,
        );
        ctx.data.seeds = vec![Seed::new(
            vec![MeasurementIndex(0), MeasurementIndex(1), MeasurementIndex(2)],
            RegionId::new(8, 2),
            0.0,
            1.0,
        )
        .unwrap()];

        stage.execute(&mut ctx, &resources).unwrap();
        assert_eq!(ctx.data.tracks.len(), 1);
        assert_eq!(ctx.data.tracks[0].n_measurements(), ctx.data.measurements.len());
        assert!(logs_contain("Found tracks"));
    }
}
