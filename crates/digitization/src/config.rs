//! Smearing configuration file and region lookup.

use crate::smearing::SmearingModel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracklab_core::ConfigError;
use tracklab_types::GeometryId;

/// Smearing for one detector region.
///
/// `layer` and `sensitive` narrow the match; leaving them out applies the
/// entry to the whole volume or layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionSmearing {
    pub volume: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitive: Option<u32>,
    pub loc0: SmearingModel,
    pub loc1: SmearingModel,
}

impl RegionSmearing {
    pub fn volume(volume: u32, loc0: SmearingModel, loc1: SmearingModel) -> Self {
        Self {
            volume,
            layer: None,
            sensitive: None,
            loc0,
            loc1,
        }
    }

    pub fn with_layer(mut self, layer: u32) -> Self {
        self.layer = Some(layer);
        self
    }

    pub fn with_sensitive(mut self, sensitive: u32) -> Self {
        self.sensitive = Some(sensitive);
        self
    }

    fn key(&self) -> (u32, Option<u32>, Option<u32>) {
        (self.volume, self.layer, self.sensitive)
    }
}

/// Contents of the smearing configuration file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SmearingConfig {
    pub regions: Vec<RegionSmearing>,
    /// Hits on the same module closer than this (mm, local frame) are
    /// merged into one measurement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_distance: Option<f64>,
}

impl SmearingConfig {
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(input).map_err(|e| ConfigError::Parse {
            what: "smearing configuration".to_string(),
            reason: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_json_str(&ConfigError::read_file(path)?)
    }

    pub fn with_region(mut self, region: RegionSmearing) -> Self {
        self.regions.push(region);
        self
    }

    pub fn with_merge_distance(mut self, distance: f64) -> Self {
        self.merge_distance = Some(distance);
        self
    }

    /// Resolutions for the generic detector: fine pixels in the barrel
    /// (volume 8) and disks (7, 9), long strips in volume 13.
    pub fn generic() -> Self {
        let gauss = |stddev| SmearingModel::Gauss { stddev };
        let disk = |volume| RegionSmearing::volume(volume, gauss(0.05), gauss(0.01));
        Self::default()
            .with_region(disk(7))
            .with_region(RegionSmearing::volume(8, gauss(0.01), gauss(0.05)))
            .with_region(disk(9))
            .with_region(RegionSmearing::volume(
                13,
                gauss(0.04),
                SmearingModel::GaussClipped {
                    stddev: 0.5,
                    min: -1100.0,
                    max: 1100.0,
                },
            ))
    }
}

/// Validated smearing lookup by most specific region.
#[derive(Clone, Debug)]
pub struct SmearingMap {
    entries: HashMap<(u32, Option<u32>, Option<u32>), RegionSmearing>,
    merge_distance: f64,
}

impl SmearingMap {
    pub fn new(config: &SmearingConfig) -> Result<Self, ConfigError> {
        let merge_distance = config.merge_distance.unwrap_or(0.0);
        if merge_distance.is_nan() || merge_distance < 0.0 {
            return Err(ConfigError::invalid(
                "merge_distance",
                "must not be negative",
            ));
        }

        let mut entries = HashMap::with_capacity(config.regions.len());
        for region in &config.regions {
            let name = region_name(region);
            if region.sensitive.is_some() && region.layer.is_none() {
                return Err(ConfigError::invalid(&name, "sensitive requires a layer"));
            }
            region.loc0.validate(&format!("{name}.loc0"))?;
            region.loc1.validate(&format!("{name}.loc1"))?;
            if entries.insert(region.key(), region.clone()).is_some() {
                return Err(ConfigError::invalid(&name, "defined twice"));
            }
        }
        Ok(Self {
            entries,
            merge_distance,
        })
    }

    /// Most specific entry for a surface: (volume, layer, sensitive), then
    /// (volume, layer), then (volume).
    pub fn lookup(&self, id: GeometryId) -> Option<&RegionSmearing> {
        self.entries
            .get(&(id.volume, Some(id.layer), Some(id.sensitive)))
            .or_else(|| self.entries.get(&(id.volume, Some(id.layer), None)))
            .or_else(|| self.entries.get(&(id.volume, None, None)))
    }

    pub fn merge_distance(&self) -> f64 {
        self.merge_distance
    }
}

fn region_name(region: &RegionSmearing) -> String {
    let mut name = format!("smearing[vol={}", region.volume);
    if let Some(layer) = region.layer {
        name.push_str(&format!("|lay={layer}"));
    }
    if let Some(sensitive) = region.sensitive {
        name.push_str(&format!("|sen={sensitive}"));
    }
    name.push(']');
    name
}
