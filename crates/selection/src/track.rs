//! Track selection criteria.

use crate::particle::ChargeSign;
use crate::range::{CountRange, Range};
use crate::Criteria;
use serde::{Deserialize, Serialize};
use tracklab_core::ConfigError;
use tracklab_types::TrackCandidate;

/// Criteria on reconstructed tracks. Every set criterion must pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackCriteria {
    /// Transverse impact parameter (mm).
    pub d0: Range,
    /// Longitudinal impact parameter (mm).
    pub z0: Range,
    pub phi: Range,
    pub eta: Range,
    pub abs_eta: Range,
    pub pt: Range,
    pub measurements: CountRange,
    pub max_holes: Option<u32>,
    pub max_shared: Option<u32>,
    pub max_chi2_per_ndf: Option<f64>,
    /// Lower bound on [`TrackCandidate::quality`].
    pub min_quality: Option<f64>,
    pub charge: Option<ChargeSign>,
}

impl TrackCriteria {
    pub fn with_eta(mut self, eta: Range) -> Self {
        self.eta = eta;
        self
    }

    pub fn with_pt(mut self, pt: Range) -> Self {
        self.pt = pt;
        self
    }

    pub fn with_min_measurements(mut self, min: usize) -> Self {
        self.measurements = CountRange::at_least(min);
        self
    }

    pub fn with_max_holes(mut self, holes: u32) -> Self {
        self.max_holes = Some(holes);
        self
    }

    pub fn with_max_chi2_per_ndf(mut self, chi2: f64) -> Self {
        self.max_chi2_per_ndf = Some(chi2);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.d0.validate("d0")?;
        self.z0.validate("z0")?;
        self.phi.validate("phi")?;
        self.eta.validate("eta")?;
        self.abs_eta.validate("abs_eta")?;
        self.pt.validate("pt")?;
        self.measurements.validate("measurements")?;
        if self.max_chi2_per_ndf.is_some_and(|chi2| chi2.is_nan() || chi2 < 0.0) {
            return Err(ConfigError::invalid(
                "max_chi2_per_ndf",
                "must be a non-negative number",
            ));
        }
        if self.min_quality.is_some_and(|q| !(0.0..=1.0).contains(&q)) {
            return Err(ConfigError::invalid("min_quality", "must be within [0, 1]"));
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Criteria<TrackCandidate> for TrackCriteria {
    fn accepts(&self, track: &TrackCandidate) -> bool {
        let params = &track.parameters;
        let eta = params.eta();
        self.d0.contains(params.d0)
            && self.z0.contains(params.z0)
            && self.phi.contains(params.phi)
            && self.eta.contains(eta)
            && self.abs_eta.contains(eta.abs())
            && self.pt.contains(params.pt())
            && self.measurements.contains(track.n_measurements())
            && self.max_holes.map_or(true, |max| track.holes <= max)
            && self.max_shared.map_or(true, |max| track.shared <= max)
            && self
                .max_chi2_per_ndf
                .map_or(true, |max| track.chi2_per_ndf() <= max)
            && self.min_quality.map_or(true, |min| track.quality() >= min)
            && self.charge.map_or(true, |sign| sign.matches(params.charge()))
    }

    fn is_empty(&self) -> bool {
        TrackCriteria::is_empty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply;
    use tracklab_types::{MeasurementIndex, TrackParameters};

    fn track(n_measurements: u32, theta: f64) -> TrackCandidate {
        TrackCandidate {
            seed: 0,
            measurements: (0..n_measurements).map(MeasurementIndex).collect(),
            parameters: TrackParameters {
                d0: 0.1,
                z0: -3.0,
                phi: 0.4,
                theta,
                q_over_p: -0.5,
            },
            chi2: 2.0 * f64::from(n_measurements),
            ndf: 2 * n_measurements - 5,
            holes: 0,
            shared: 0,
        }
    }

    #[test]
    fn test_min_measurements_within_eta_window() {
        let central = std::f64::consts::FRAC_PI_2;
        let tracks = vec![track(8, central), track(10, central)];
        let criteria = TrackCriteria::default()
            .with_eta(Range::new(-4.0, 4.0))
            .with_min_measurements(9);
        let selected = apply(&tracks, &criteria);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].n_measurements(), 10);
    }

    #[test]
    fn test_forward_track_outside_eta_window() {
        // theta = 0.01 rad is eta ~ 5.3
        let tracks = vec![track(10, 0.01)];
        let criteria = TrackCriteria::default().with_eta(Range::new(-4.0, 4.0));
        assert!(apply(&tracks, &criteria).is_empty());
    }

    #[test]
    fn test_quality_and_charge_criteria() {
        let tracks = vec![track(10, 1.2)];
        let negative = TrackCriteria {
            charge: Some(ChargeSign::Negative),
            ..Default::default()
        };
        assert_eq!(apply(&tracks, &negative).len(), 1);

        let positive = TrackCriteria {
            charge: Some(ChargeSign::Positive),
            ..Default::default()
        };
        assert!(apply(&tracks, &positive).is_empty());

        let strict = TrackCriteria::default().with_max_chi2_per_ndf(1.0);
        assert!(apply(&tracks, &strict).is_empty());
    }

    #[test]
    fn test_validate_rejects_bad_quality() {
        let criteria = TrackCriteria {
            min_quality: Some(1.5),
            ..Default::default()
        };
        assert!(criteria.validate().is_err());
        assert!(TrackCriteria::default().validate().is_ok());
    }
}
