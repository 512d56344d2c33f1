//! Space points and track seeds.

use crate::identifiers::{GeometryId, MeasurementIndex, RegionId};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest number of measurements a seed may hold.
pub const MIN_SEED_SIZE: usize = 3;

/// Largest number of measurements a seed may hold.
pub const MAX_SEED_SIZE: usize = 4;

/// A measurement promoted to a three-dimensional point for seeding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpacePoint {
    pub measurement: MeasurementIndex,
    pub surface: GeometryId,
    pub position: Vector3<f64>,
    pub var_r: f64,
    pub var_z: f64,
}

impl SpacePoint {
    pub fn r(&self) -> f64 {
        self.position.xy().norm()
    }

    pub fn z(&self) -> f64 {
        self.position.z
    }

    pub fn phi(&self) -> f64 {
        self.position.y.atan2(self.position.x)
    }

    pub fn region(&self) -> RegionId {
        self.surface.region()
    }
}

/// Errors constructing a seed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeedError {
    #[error("seed needs 3 to 4 measurements, got {0}")]
    InvalidSize(usize),

    #[error("seed references {0} more than once")]
    DuplicateMeasurement(MeasurementIndex),
}

/// A short chain of measurements believed to come from one particle.
///
/// Seeds are immutable; the measurements are ordered from the innermost
/// to the outermost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seed {
    measurements: Vec<MeasurementIndex>,
    region: RegionId,
    z_vertex: f64,
    quality: f64,
}

impl Seed {
    /// Create a seed, checking its size and that no measurement repeats.
    pub fn new(
        measurements: Vec<MeasurementIndex>,
        region: RegionId,
        z_vertex: f64,
        quality: f64,
    ) -> Result<Self, SeedError> {
        if !(MIN_SEED_SIZE..=MAX_SEED_SIZE).contains(&measurements.len()) {
            return Err(SeedError::InvalidSize(measurements.len()));
        }
        for (i, m) in measurements.iter().enumerate() {
            if measurements[..i].contains(m) {
                return Err(SeedError::DuplicateMeasurement(*m));
            }
        }
        Ok(Self {
            measurements,
            region,
            z_vertex,
            quality,
        })
    }

    pub fn measurements(&self) -> &[MeasurementIndex] {
        &self.measurements
    }

    /// Region tag of the seed.
    pub fn region(&self) -> RegionId {
        self.region
    }

    /// Estimated longitudinal position of the origin vertex in mm.
    pub fn z_vertex(&self) -> f64 {
        self.z_vertex
    }

    /// Algorithm-specific quality; higher is better.
    pub fn quality(&self) -> f64 {
        self.quality
    }
}
