//! Per-coordinate smearing models.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracklab_core::random::{sample_gaussian, sample_uniform};
use tracklab_core::ConfigError;

/// Attempts before a truncated Gaussian gives up.
const MAX_RESAMPLES: usize = 100;

/// How one local coordinate is turned into a measured value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum SmearingModel {
    /// Unbounded Gaussian.
    Gauss { stddev: f64 },
    /// Gaussian resampled until the value falls within `[min, max]`.
    GaussTrunc { stddev: f64, min: f64, max: f64 },
    /// Gaussian clamped to `[min, max]`.
    GaussClipped { stddev: f64, min: f64, max: f64 },
    /// Uniform within the pitch bin containing the true value.
    Uniform { pitch: f64, min: f64, max: f64 },
    /// Centre of the pitch bin containing the true value.
    Digital { pitch: f64, min: f64, max: f64 },
}

impl SmearingModel {
    pub fn validate(&self, parameter: &str) -> Result<(), ConfigError> {
        let positive = |name: &str, value: f64| {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::invalid(
                    &format!("{parameter}.{name}"),
                    "must be positive",
                ))
            }
        };
        match *self {
            SmearingModel::Gauss { stddev } => positive("stddev", stddev),
            SmearingModel::GaussTrunc { stddev, min, max }
            | SmearingModel::GaussClipped { stddev, min, max } => {
                positive("stddev", stddev)?;
                ConfigError::check_range(parameter, min, max)
            }
            SmearingModel::Uniform { pitch, min, max }
            | SmearingModel::Digital { pitch, min, max } => {
                positive("pitch", pitch)?;
                ConfigError::check_range(parameter, min, max)
            }
        }
    }

    /// Smear `value`, returning the measured value and its variance.
    ///
    /// `None` if the value cannot be measured: outside a binned range or
    /// not recoverable within the truncation.
    pub fn smear(&self, value: f64, rng: &mut impl Rng) -> Option<(f64, f64)> {
        match *self {
            SmearingModel::Gauss { stddev } => {
                Some((value + sample_gaussian(rng, 0.0, stddev), stddev * stddev))
            }
            SmearingModel::GaussTrunc { stddev, min, max } => (0..MAX_RESAMPLES)
                .map(|_| value + sample_gaussian(rng, 0.0, stddev))
                .find(|smeared| (min..=max).contains(smeared))
                .map(|smeared| (smeared, stddev * stddev)),
            SmearingModel::GaussClipped { stddev, min, max } => {
                let smeared = value + sample_gaussian(rng, 0.0, stddev);
                Some((smeared.clamp(min, max), stddev * stddev))
            }
            SmearingModel::Uniform { pitch, min, max } => {
                let low = bin_low(value, pitch, min, max)?;
                Some((sample_uniform(rng, low, low + pitch), pitch * pitch / 12.0))
            }
            SmearingModel::Digital { pitch, min, max } => {
                let low = bin_low(value, pitch, min, max)?;
                Some((low + 0.5 * pitch, pitch * pitch / 12.0))
            }
        }
    }
}

fn bin_low(value: f64, pitch: f64, min: f64, max: f64) -> Option<f64> {
    if !(value >= min && value < max) {
        return None;
    }
    Some(min + ((value - min) / pitch).floor() * pitch)
}
