//! Optional-bound ranges.

use serde::{Deserialize, Serialize};
use tracklab_core::ConfigError;

/// Half-open interval `[min, max)`; an unset bound does not constrain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Range {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Range {
    /// No constraint on either side.
    pub const UNBOUNDED: Range = Range {
        min: None,
        max: None,
    };

    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn below(max: f64) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value < max)
    }

    pub fn validate(&self, parameter: &str) -> Result<(), ConfigError> {
        if self.min.is_some_and(f64::is_nan) || self.max.is_some_and(f64::is_nan) {
            return Err(ConfigError::invalid(parameter, "bound is NaN"));
        }
        match (self.min, self.max) {
            (Some(min), Some(max)) => ConfigError::check_range(parameter, min, max),
            _ => Ok(()),
        }
    }
}

/// Closed integer interval `[min, max]`; an unset bound does not constrain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountRange {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl CountRange {
    pub fn at_least(min: usize) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, value: usize) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }

    pub fn validate(&self, parameter: &str) -> Result<(), ConfigError> {
        match (self.min, self.max) {
            (Some(min), Some(max)) => ConfigError::check_range(parameter, min as f64, max as f64),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_bounds_do_not_constrain() {
        assert!(Range::UNBOUNDED.contains(f64::MAX));
        assert!(Range::at_least(1.0).contains(1e12));
        assert!(!Range::at_least(1.0).contains(0.5));
        assert!(Range::below(4.0).contains(-1e12));
    }

    #[test]
    fn test_range_is_half_open() {
        let range = Range::new(-4.0, 4.0);
        assert!(range.contains(-4.0));
        assert!(!range.contains(4.0));
        assert!(!range.contains(f64::NAN));
    }

    #[test]
    fn test_inverted_range_rejected() {
        assert!(Range::new(2.0, 1.0).validate("pt").is_err());
        assert!(Range::new(1.0, 1.0).validate("pt").is_ok());
        assert!(CountRange {
            min: Some(9),
            max: Some(3)
        }
        .validate("measurements")
        .is_err());
    }

    #[test]
    fn test_count_range_is_closed() {
        let range = CountRange {
            min: Some(3),
            max: Some(5),
        };
        assert!(range.contains(3) && range.contains(5));
        assert!(!range.contains(2) && !range.contains(6));
    }
}
