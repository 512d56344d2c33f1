//! Shared, immutable resources for a run.

use crate::random::RandomNumbers;
use std::sync::Arc;
use tracklab_detector::{MagneticField, TrackingGeometry};

/// Geometry, field and random-number factory for a run.
///
/// Built once before any event is processed and passed by reference to
/// every stage; nothing in it changes during the run.
#[derive(Clone)]
pub struct PipelineResources {
    pub geometry: Arc<dyn TrackingGeometry>,
    pub field: Arc<dyn MagneticField>,
    pub random: RandomNumbers,
}

impl PipelineResources {
    pub fn new(
        geometry: Arc<dyn TrackingGeometry>,
        field: Arc<dyn MagneticField>,
        seed: u64,
    ) -> Self {
        Self {
            geometry,
            field,
            random: RandomNumbers::new(seed),
        }
    }

    /// Longitudinal field at the origin, used by algorithms that assume a
    /// uniform solenoid.
    pub fn central_bz(&self) -> f64 {
        self.field.bz_at(&tracklab_types::Vector3::zeros())
    }
}

impl std::fmt::Debug for PipelineResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineResources")
            .field("geometry", &self.geometry.name())
            .field("seed", &self.random.seed())
            .finish()
    }
}
