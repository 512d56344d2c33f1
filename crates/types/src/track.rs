//! Reconstructed track candidates.

use crate::identifiers::MeasurementIndex;
use crate::kinematics::eta_from_theta;
use serde::{Deserialize, Serialize};

/// Perigee parameters with respect to the beam line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackParameters {
    /// Signed transverse impact parameter in mm.
    pub d0: f64,
    /// Longitudinal impact parameter in mm.
    pub z0: f64,
    /// Azimuth of the momentum at the perigee.
    pub phi: f64,
    /// Polar angle of the momentum.
    pub theta: f64,
    /// Charge over absolute momentum in 1/GeV.
    pub q_over_p: f64,
}

impl TrackParameters {
    pub fn p(&self) -> f64 {
        if self.q_over_p == 0.0 {
            f64::INFINITY
        } else {
            1.0 / self.q_over_p.abs()
        }
    }

    pub fn pt(&self) -> f64 {
        self.p() * self.theta.sin()
    }

    pub fn eta(&self) -> f64 {
        eta_from_theta(self.theta)
    }

    pub fn charge(&self) -> f64 {
        self.q_over_p.signum()
    }
}

/// A seed extended into a full trajectory hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackCandidate {
    /// Index of the seed this candidate grew from.
    pub seed: usize,

    /// Measurements ordered along the trajectory, innermost first.
    pub measurements: Vec<MeasurementIndex>,

    pub parameters: TrackParameters,

    pub chi2: f64,
    pub ndf: u32,

    /// Sensitive layers crossed without a compatible measurement.
    pub holes: u32,

    /// Measurements also used by another accepted candidate.
    pub shared: u32,
}

impl TrackCandidate {
    pub fn n_measurements(&self) -> usize {
        self.measurements.len()
    }

    pub fn chi2_per_ndf(&self) -> f64 {
        self.chi2 / f64::from(self.ndf.max(1))
    }

    /// Quality score in `(0, 1]`; 1 is a perfect fit.
    pub fn quality(&self) -> f64 {
        1.0 / (1.0 + self.chi2_per_ndf())
    }

    /// Number of measurements shared with another candidate.
    pub fn overlap(&self, other: &TrackCandidate) -> usize {
        self.measurements
            .iter()
            .filter(|m| other.measurements.contains(m))
            .count()
    }
}
