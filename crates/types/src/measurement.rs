//! Digitized measurements.

use crate::identifiers::{GeometryId, HitIndex, MeasurementIndex, RegionId};
use nalgebra::{Matrix2, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// A smeared two-dimensional measurement on a detector surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub index: MeasurementIndex,
    pub surface: GeometryId,

    /// Smeared local coordinates on the surface.
    pub local: Vector2<f64>,

    /// Covariance of the local coordinates.
    pub covariance: Matrix2<f64>,

    /// Global position of the smeared local coordinates.
    pub global: Vector3<f64>,

    /// Simulated hits that contributed to this measurement.
    pub hits: Vec<HitIndex>,
}

impl Measurement {
    pub fn region(&self) -> RegionId {
        self.surface.region()
    }

    /// Transverse radius of the global position.
    pub fn r(&self) -> f64 {
        self.global.xy().norm()
    }

    pub fn z(&self) -> f64 {
        self.global.z
    }

    pub fn phi(&self) -> f64 {
        self.global.y.atan2(self.global.x)
    }

    /// Variance of the first local coordinate.
    pub fn var_loc0(&self) -> f64 {
        self.covariance[(0, 0)]
    }

    /// Variance of the second local coordinate.
    pub fn var_loc1(&self) -> f64 {
        self.covariance[(1, 1)]
    }
}
