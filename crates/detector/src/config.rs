//! Detector description.

use crate::error::ResourceError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Shape of a detector layer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerShape {
    /// Barrel layer: a cylinder around the beam line centred at z = 0.
    Cylinder { radius: f64, half_length: f64 },

    /// Endcap layer: an annulus perpendicular to the beam line.
    Disk { z: f64, r_min: f64, r_max: f64 },
}

/// Description of one layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub volume: u32,
    pub layer: u32,
    pub shape: LayerShape,

    /// Whether crossings produce hits.
    #[serde(default = "default_sensitive")]
    pub sensitive: bool,

    /// Material thickness in radiation lengths at normal incidence.
    #[serde(default)]
    pub thickness_x0: f64,

    /// Number of modules in azimuth.
    #[serde(default = "default_modules")]
    pub modules_phi: u32,

    /// Number of modules along z (barrel) or r (endcap).
    #[serde(default = "default_modules")]
    pub modules_long: u32,
}

fn default_sensitive() -> bool {
    true
}

fn default_modules() -> u32 {
    1
}

impl LayerConfig {
    /// Sensitive barrel layer.
    pub fn barrel(volume: u32, layer: u32, radius: f64, half_length: f64) -> Self {
        Self {
            volume,
            layer,
            shape: LayerShape::Cylinder {
                radius,
                half_length,
            },
            sensitive: true,
            thickness_x0: 0.0,
            modules_phi: 1,
            modules_long: 1,
        }
    }

    /// Sensitive endcap layer.
    pub fn disk(volume: u32, layer: u32, z: f64, r_min: f64, r_max: f64) -> Self {
        Self {
            volume,
            layer,
            shape: LayerShape::Disk { z, r_min, r_max },
            sensitive: true,
            thickness_x0: 0.0,
            modules_phi: 1,
            modules_long: 1,
        }
    }

    /// Set the module segmentation.
    pub fn with_modules(mut self, phi: u32, long: u32) -> Self {
        self.modules_phi = phi;
        self.modules_long = long;
        self
    }

    /// Set the material thickness.
    pub fn with_thickness(mut self, thickness_x0: f64) -> Self {
        self.thickness_x0 = thickness_x0;
        self
    }

    /// Mark the layer as passive material.
    pub fn passive(mut self) -> Self {
        self.sensitive = false;
        self
    }
}

/// Full detector description, loadable from TOML.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub name: String,
    pub layers: Vec<LayerConfig>,
}

impl DetectorConfig {
    /// A generic silicon tracker: beam pipe, four pixel barrel layers, five
    /// pixel disks per side and five strip barrel layers in a 2 T solenoid.
    pub fn generic() -> Self {
        let mut layers = vec![LayerConfig::barrel(1, 2, 25.0, 3000.0)
            .passive()
            .with_thickness(0.0023)];

        for (i, (radius, modules_phi)) in [(32.0, 16), (72.0, 32), (116.0, 52), (172.0, 78)]
            .into_iter()
            .enumerate()
        {
            layers.push(
                LayerConfig::barrel(8, 2 * (i as u32 + 1), radius, 500.0)
                    .with_modules(modules_phi, 14)
                    .with_thickness(0.012),
            );
        }

        for (volume, sign) in [(7u32, -1.0), (9u32, 1.0)] {
            for (i, z) in [600.0, 700.0, 820.0, 960.0, 1100.0].into_iter().enumerate() {
                layers.push(
                    LayerConfig::disk(volume, 2 * (i as u32 + 1), sign * z, 30.0, 175.0)
                        .with_modules(40, 2)
                        .with_thickness(0.012),
                );
            }
        }

        for (i, (radius, modules_phi)) in [
            (260.0, 40),
            (360.0, 56),
            (500.0, 78),
            (660.0, 102),
            (820.0, 128),
        ]
        .into_iter()
        .enumerate()
        {
            layers.push(
                LayerConfig::barrel(13, 2 * (i as u32 + 1), radius, 1100.0)
                    .with_modules(modules_phi, 21)
                    .with_thickness(0.025),
            );
        }

        Self {
            name: "generic".to_string(),
            layers,
        }
    }

    /// Parse a TOML detector description.
    pub fn from_toml_str(input: &str) -> Result<Self, ResourceError> {
        toml::from_str(input).map_err(|e| ResourceError::GeometryParse(e.to_string()))
    }

    /// Load a TOML detector description from disk.
    pub fn load(path: &Path) -> Result<Self, ResourceError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ResourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }
}
