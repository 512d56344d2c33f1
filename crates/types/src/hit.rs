//! Simulated detector hits.

use crate::identifiers::{GeometryId, ParticleId};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Intersection of a simulated particle with a sensitive surface.
///
/// The particle is referenced by id only; hits never own particles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedHit {
    pub particle: ParticleId,
    pub surface: GeometryId,

    /// Global position in mm.
    pub position: Vector3<f64>,

    /// Unit direction of flight at the surface.
    pub direction: Vector3<f64>,

    /// Absolute momentum at the surface in GeV.
    pub momentum: f64,

    /// Position of this hit along the particle's trajectory.
    pub index: u32,
}

impl SimulatedHit {
    pub fn r(&self) -> f64 {
        self.position.xy().norm()
    }
}
