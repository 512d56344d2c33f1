//! Tracking geometry trait and static implementation.

use crate::config::{DetectorConfig, LayerConfig, LayerShape};
use crate::error::ResourceError;
use crate::helix::Helix;
use nalgebra::{Vector2, Vector3};
use std::collections::HashMap;
use std::f64::consts::PI;
use tracing::info;
use tracklab_types::kinematics::wrap_phi;
use tracklab_types::{GeometryId, RegionId};

/// Tolerance (mm) for bound checks at layer edges.
const BOUNDS_TOLERANCE: f64 = 1e-6;

/// Placement and extent of a detector module.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceBounds {
    /// Module on a barrel layer; local coordinates are (r·Δφ, Δz).
    Barrel {
        radius: f64,
        phi: f64,
        half_phi: f64,
        z: f64,
        half_z: f64,
    },
    /// Module on an endcap disk; local coordinates are (Δr, r·Δφ).
    Endcap {
        z: f64,
        r: f64,
        half_r: f64,
        phi: f64,
        half_phi: f64,
    },
}

/// A sensitive detector module.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    id: GeometryId,
    bounds: SurfaceBounds,
}

impl Surface {
    pub fn new(id: GeometryId, bounds: SurfaceBounds) -> Self {
        Self { id, bounds }
    }

    pub fn id(&self) -> GeometryId {
        self.id
    }

    pub fn bounds(&self) -> &SurfaceBounds {
        &self.bounds
    }

    pub fn is_barrel(&self) -> bool {
        matches!(self.bounds, SurfaceBounds::Barrel { .. })
    }

    pub fn center(&self) -> Vector3<f64> {
        match self.bounds {
            SurfaceBounds::Barrel { radius, phi, z, .. } => {
                Vector3::new(radius * phi.cos(), radius * phi.sin(), z)
            }
            SurfaceBounds::Endcap { z, r, phi, .. } => {
                Vector3::new(r * phi.cos(), r * phi.sin(), z)
            }
        }
    }

    /// Local coordinates of a global position on this module.
    pub fn global_to_local(&self, position: &Vector3<f64>) -> Vector2<f64> {
        let phi = position.y.atan2(position.x);
        match self.bounds {
            SurfaceBounds::Barrel {
                radius,
                phi: center_phi,
                z,
                ..
            } => Vector2::new(radius * wrap_phi(phi - center_phi), position.z - z),
            SurfaceBounds::Endcap {
                r, phi: center_phi, ..
            } => {
                let rho = position.xy().norm();
                Vector2::new(rho - r, rho * wrap_phi(phi - center_phi))
            }
        }
    }

    /// Global position of local coordinates on this module.
    pub fn local_to_global(&self, local: &Vector2<f64>) -> Vector3<f64> {
        match self.bounds {
            SurfaceBounds::Barrel {
                radius, phi, z, ..
            } => {
                let phi = phi + local.x / radius;
                Vector3::new(radius * phi.cos(), radius * phi.sin(), z + local.y)
            }
            SurfaceBounds::Endcap { z, r, phi, .. } => {
                let rho = r + local.x;
                let phi = if rho > 0.0 { phi + local.y / rho } else { phi };
                Vector3::new(rho * phi.cos(), rho * phi.sin(), z)
            }
        }
    }
}

/// A detector layer: the unit of navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    region: RegionId,
    shape: LayerShape,
    sensitive: bool,
    thickness_x0: f64,
    modules_phi: u32,
    modules_long: u32,
    surfaces: Vec<Surface>,
}

impl Layer {
    fn build(config: &LayerConfig) -> Result<Self, ResourceError> {
        let region = RegionId::new(config.volume, config.layer);
        let invalid = |reason: &str| ResourceError::InvalidGeometry(format!("{region}: {reason}"));

        match config.shape {
            LayerShape::Cylinder {
                radius,
                half_length,
            } => {
                if !(radius > 0.0 && half_length > 0.0) {
                    return Err(invalid("cylinder needs positive radius and half length"));
                }
            }
            LayerShape::Disk { r_min, r_max, z } => {
                if !(r_min >= 0.0 && r_max > r_min && z.is_finite()) {
                    return Err(invalid("disk needs 0 <= r_min < r_max"));
                }
            }
        }
        if config.modules_phi == 0 || config.modules_long == 0 {
            return Err(invalid("module counts must be positive"));
        }
        if config.thickness_x0.is_nan() || config.thickness_x0 < 0.0 {
            return Err(invalid("material thickness must not be negative"));
        }

        let mut layer = Self {
            region,
            shape: config.shape,
            sensitive: config.sensitive,
            thickness_x0: config.thickness_x0,
            modules_phi: config.modules_phi,
            modules_long: config.modules_long,
            surfaces: Vec::new(),
        };
        if layer.sensitive {
            layer.surfaces = layer.build_surfaces();
        }
        Ok(layer)
    }

    fn build_surfaces(&self) -> Vec<Surface> {
        let half_phi = PI / f64::from(self.modules_phi);
        let mut surfaces = Vec::with_capacity((self.modules_phi * self.modules_long) as usize);
        for i in 0..self.modules_phi {
            let phi = -PI + f64::from(2 * i + 1) * half_phi;
            for j in 0..self.modules_long {
                let sensitive = i * self.modules_long + j + 1;
                let id = GeometryId::new(self.region.volume, self.region.layer, sensitive);
                let bounds = match self.shape {
                    LayerShape::Cylinder {
                        radius,
                        half_length,
                    } => {
                        let half_z = half_length / f64::from(self.modules_long);
                        SurfaceBounds::Barrel {
                            radius,
                            phi,
                            half_phi,
                            z: -half_length + f64::from(2 * j + 1) * half_z,
                            half_z,
                        }
                    }
                    LayerShape::Disk { z, r_min, r_max } => {
                        let half_r = (r_max - r_min) / (2.0 * f64::from(self.modules_long));
                        SurfaceBounds::Endcap {
                            z,
                            r: r_min + f64::from(2 * j + 1) * half_r,
                            half_r,
                            phi,
                            half_phi,
                        }
                    }
                };
                surfaces.push(Surface::new(id, bounds));
            }
        }
        surfaces
    }

    pub fn region(&self) -> RegionId {
        self.region
    }

    pub fn shape(&self) -> &LayerShape {
        &self.shape
    }

    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    pub fn is_barrel(&self) -> bool {
        matches!(self.shape, LayerShape::Cylinder { .. })
    }

    pub fn thickness_x0(&self) -> f64 {
        self.thickness_x0
    }

    /// Modules of the layer; empty for passive layers.
    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    /// Module with the given sensitive number.
    pub fn surface(&self, sensitive: u32) -> Option<&Surface> {
        let index = sensitive.checked_sub(1)?;
        self.surfaces.get(index as usize)
    }

    /// Whether a position on the layer's reference surface lies within
    /// the layer's extent.
    pub fn contains(&self, position: &Vector3<f64>) -> bool {
        match self.shape {
            LayerShape::Cylinder { half_length, .. } => {
                position.z.abs() <= half_length + BOUNDS_TOLERANCE
            }
            LayerShape::Disk { r_min, r_max, .. } => {
                let rho = position.xy().norm();
                rho >= r_min - BOUNDS_TOLERANCE && rho <= r_max + BOUNDS_TOLERANCE
            }
        }
    }

    /// Module containing a position on the layer.
    pub fn surface_at(&self, position: &Vector3<f64>) -> Option<&Surface> {
        if self.surfaces.is_empty() || !self.contains(position) {
            return None;
        }
        let phi = position.y.atan2(position.x);
        let phi_bin = bin(phi, -PI, PI, self.modules_phi);
        let long_bin = match self.shape {
            LayerShape::Cylinder { half_length, .. } => {
                bin(position.z, -half_length, half_length, self.modules_long)
            }
            LayerShape::Disk { r_min, r_max, .. } => {
                bin(position.xy().norm(), r_min, r_max, self.modules_long)
            }
        };
        self.surfaces
            .get((phi_bin * self.modules_long + long_bin) as usize)
    }

    /// Unit normal of the layer at a position.
    pub fn normal_at(&self, position: &Vector3<f64>) -> Vector3<f64> {
        match self.shape {
            LayerShape::Cylinder { .. } => Vector3::new(position.x, position.y, 0.0)
                .try_normalize(1e-12)
                .unwrap_or_else(Vector3::x),
            LayerShape::Disk { .. } => Vector3::z(),
        }
    }

    /// Path length along `helix` to its nearest forward crossing of this
    /// layer within bounds.
    pub fn intersect(&self, helix: &Helix) -> Option<f64> {
        let l = match self.shape {
            LayerShape::Cylinder { radius, .. } => helix.intersect_cylinder(radius)?,
            LayerShape::Disk { z, .. } => helix.intersect_plane(z)?,
        };
        self.contains(&helix.position_at(l)).then_some(l)
    }
}

fn bin(value: f64, min: f64, max: f64, count: u32) -> u32 {
    let fraction = (value - min) / (max - min);
    let index = (fraction * f64::from(count)).floor();
    index.clamp(0.0, f64::from(count - 1)) as u32
}

/// The next layer crossed along a trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    /// Index into [`TrackingGeometry::layers`].
    pub layer: usize,
    pub path_length: f64,
    pub position: Vector3<f64>,
    pub direction: Vector3<f64>,
}

/// Read-only view of the tracking detector.
///
/// Implementations are shared across all event workers.
pub trait TrackingGeometry: Send + Sync {
    /// Detector name for logging.
    fn name(&self) -> &str;

    /// All layers, sensitive and passive.
    fn layers(&self) -> &[Layer];

    /// Index of the layer for a region.
    fn layer_index(&self, region: RegionId) -> Option<usize>;

    // Derived methods

    fn layer(&self, region: RegionId) -> Option<&Layer> {
        self.layer_index(region).map(|i| &self.layers()[i])
    }

    /// Look up a module by identity.
    fn surface(&self, id: GeometryId) -> Option<&Surface> {
        self.layer(id.region())?.surface(id.sensitive)
    }

    /// Every sensitive module of the detector.
    fn sensitive_surfaces(&self) -> Vec<&Surface> {
        self.layers()
            .iter()
            .flat_map(|layer| layer.surfaces().iter())
            .collect()
    }

    /// Nearest layer crossed by `helix`, if any.
    fn next_crossing(&self, helix: &Helix) -> Option<Crossing> {
        self.layers()
            .iter()
            .enumerate()
            .filter_map(|(i, layer)| layer.intersect(helix).map(|l| (i, l)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(layer, path_length)| Crossing {
                layer,
                path_length,
                position: helix.position_at(path_length),
                direction: helix.direction_at(path_length),
            })
    }
}

/// Geometry built from a [`DetectorConfig`].
#[derive(Debug, Clone)]
pub struct DetectorGeometry {
    name: String,
    layers: Vec<Layer>,
    index: HashMap<RegionId, usize>,
}

impl DetectorGeometry {
    /// Build and validate the geometry.
    pub fn build(config: &DetectorConfig) -> Result<Self, ResourceError> {
        if config.layers.is_empty() {
            return Err(ResourceError::InvalidGeometry(format!(
                "detector '{}' has no layers",
                config.name
            )));
        }

        let mut layers = Vec::with_capacity(config.layers.len());
        let mut index = HashMap::new();
        for layer_config in &config.layers {
            let layer = Layer::build(layer_config)?;
            if index.insert(layer.region(), layers.len()).is_some() {
                return Err(ResourceError::InvalidGeometry(format!(
                    "{} defined twice",
                    layer.region()
                )));
            }
            layers.push(layer);
        }

        info!(
            detector = %config.name,
            layers = layers.len(),
            sensitive_layers = layers.iter().filter(|l| l.is_sensitive()).count(),
            "Built detector geometry"
        );

        Ok(Self {
            name: config.name.clone(),
            layers,
            index,
        })
    }

    /// The built-in generic detector.
    pub fn generic() -> Result<Self, ResourceError> {
        Self::build(&DetectorConfig::generic())
    }
}

impl TrackingGeometry for DetectorGeometry {
    fn name(&self) -> &str {
        &self.name
    }

    fn layers(&self) -> &[Layer] {
        &self.layers
    }

    fn layer_index(&self, region: RegionId) -> Option<usize> {
        self.index.get(&region).copied()
    }
}
