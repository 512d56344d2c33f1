//! Fast simulation configuration.

use serde::{Deserialize, Serialize};
use tracklab_core::ConfigError;

/// Fast simulation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FatrasConfig {
    /// Apply Highland multiple scattering at material crossings.
    pub multiple_scattering: bool,
    /// Apply constant energy loss at material crossings.
    pub energy_loss: bool,
    /// Particles below this transverse momentum (GeV) stop.
    pub pt_min: f64,
    /// Maximum number of layer crossings per particle.
    pub max_crossings: u32,
    /// Maximum path length per particle (mm).
    pub max_path_length: f64,
}

impl Default for FatrasConfig {
    fn default() -> Self {
        Self {
            multiple_scattering: true,
            energy_loss: true,
            pt_min: 0.05,
            max_crossings: 64,
            max_path_length: 20_000.0,
        }
    }
}

impl FatrasConfig {
    /// Pure helix propagation without material effects.
    pub fn without_material(mut self) -> Self {
        self.multiple_scattering = false;
        self.energy_loss = false;
        self
    }

    pub fn with_pt_min(mut self, pt_min: f64) -> Self {
        self.pt_min = pt_min;
        self
    }

    pub fn with_max_crossings(mut self, max_crossings: u32) -> Self {
        self.max_crossings = max_crossings;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.pt_min.is_finite() && self.pt_min >= 0.0) {
            return Err(ConfigError::invalid(
                "fatras.pt_min",
                "must be a non-negative number",
            ));
        }
        if !(self.max_path_length > 0.0) {
            return Err(ConfigError::invalid(
                "fatras.max_path_length",
                "must be positive",
            ));
        }
        Ok(())
    }
}
