//! Track finding configuration.

use serde::{Deserialize, Serialize};
use tracklab_core::ConfigError;

/// Limits and cuts of the branching track finder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackFindingConfig {
    /// Largest χ² of a measurement against the extrapolation.
    pub chi2_cut: f64,
    /// Compatible measurements followed on one layer.
    pub max_branches_per_layer: usize,
    /// Branches explored per seed.
    pub max_branches: usize,
    /// Sensitive layers a branch may cross without a measurement.
    pub max_holes: u32,
    pub min_measurements: usize,
    /// Extrapolation uncertainty (mm) added to each local coordinate.
    pub extrapolation_sigma: f64,
    /// Largest fraction of shared measurements between two kept tracks.
    pub max_overlap: f64,
    /// Layer crossings per branch.
    pub max_steps: u32,
}

impl Default for TrackFindingConfig {
    fn default() -> Self {
        Self {
            chi2_cut: 15.0,
            max_branches_per_layer: 3,
            max_branches: 16,
            max_holes: 2,
            min_measurements: 6,
            extrapolation_sigma: 0.5,
            max_overlap: 0.5,
            max_steps: 64,
        }
    }
}

impl TrackFindingConfig {
    pub fn with_min_measurements(mut self, min_measurements: usize) -> Self {
        self.min_measurements = min_measurements;
        self
    }

    pub fn with_max_holes(mut self, max_holes: u32) -> Self {
        self.max_holes = max_holes;
        self
    }

    pub fn with_chi2_cut(mut self, chi2_cut: f64) -> Self {
        self.chi2_cut = chi2_cut;
        self
    }

    pub fn with_max_overlap(mut self, max_overlap: f64) -> Self {
        self.max_overlap = max_overlap;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.chi2_cut > 0.0) {
            return Err(ConfigError::invalid("tracking.chi2_cut", "must be positive"));
        }
        if self.max_branches_per_layer == 0 || self.max_branches == 0 {
            return Err(ConfigError::invalid(
                "tracking",
                "branch limits must be at least 1",
            ));
        }
        if self.min_measurements < 3 {
            return Err(ConfigError::invalid(
                "tracking.min_measurements",
                "a helix needs at least 3 measurements",
            ));
        }
        if !(self.extrapolation_sigma >= 0.0) {
            return Err(ConfigError::invalid(
                "tracking.extrapolation_sigma",
                "must not be negative",
            ));
        }
        if !(0.0..=1.0).contains(&self.max_overlap) {
            return Err(ConfigError::invalid(
                "tracking.max_overlap",
                "must be a fraction in [0, 1]",
            ));
        }
        if self.max_steps == 0 {
            return Err(ConfigError::invalid("tracking.max_steps", "must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(TrackFindingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(TrackFindingConfig::default()
            .with_min_measurements(2)
            .validate()
            .is_err());
        assert!(TrackFindingConfig::default()
            .with_max_overlap(1.5)
            .validate()
            .is_err());
        assert!(TrackFindingConfig::default()
            .with_chi2_cut(0.0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: TrackFindingConfig =
            toml::from_str("max_holes = 1\nmin_measurements = 8").unwrap();
        assert_eq!(config.max_holes, 1);
        assert_eq!(config.min_measurements, 8);
        assert_eq!(config.chi2_cut, 15.0);
    }
}
