//! Logical layers of the graph-based seed finder.

use super::tables::{GeometrySelection, LayerMapping};
use std::collections::{BTreeMap, HashMap};
use tracklab_detector::{SurfaceBounds, TrackingGeometry};
use tracklab_types::GeometryId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Barrel,
    Endcap,
}

/// A group of modules treated as one layer by the seed finder.
///
/// Barrel layers have a reference radius and bounds in z; endcap layers a
/// reference z and bounds in r.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalLayer {
    pub id: u32,
    pub kind: LayerKind,
    pub reference: f64,
    pub min_bound: f64,
    pub max_bound: f64,
    pub eta_min: f64,
    pub eta_max: f64,
    pub n_bins: usize,
    /// Index of the layer's first bin among all layers' bins.
    pub first_bin: usize,
}

impl LogicalLayer {
    /// Local eta bin of a point at pseudorapidity `eta`.
    pub fn bin_of(&self, eta: f64) -> usize {
        let width = (self.eta_max - self.eta_min) / self.n_bins as f64;
        if !(width > 0.0) {
            return 0;
        }
        let bin = ((eta - self.eta_min) / width).floor();
        bin.clamp(0.0, (self.n_bins - 1) as f64) as usize
    }
}

#[derive(Default)]
struct Extent {
    kind: Option<LayerKind>,
    reference_sum: f64,
    count: usize,
    min_bound: f64,
    max_bound: f64,
    eta_min: f64,
    eta_max: f64,
}

impl Extent {
    fn add(&mut self, kind: LayerKind, reference: f64, low: f64, high: f64, etas: [f64; 2]) {
        if self.count == 0 {
            self.min_bound = low;
            self.max_bound = high;
            self.eta_min = etas[0].min(etas[1]);
            self.eta_max = etas[0].max(etas[1]);
        } else {
            self.min_bound = self.min_bound.min(low);
            self.max_bound = self.max_bound.max(high);
            self.eta_min = self.eta_min.min(etas[0]).min(etas[1]);
            self.eta_max = self.eta_max.max(etas[0]).max(etas[1]);
        }
        self.kind.get_or_insert(kind);
        self.reference_sum += reference;
        self.count += 1;
    }
}

fn eta(r: f64, z: f64) -> f64 {
    (z / r.max(f64::MIN_POSITIVE)).asinh()
}

/// Logical layers of the selected and mapped modules.
#[derive(Debug, Clone, Default)]
pub struct GbtsGeometry {
    layers: Vec<LogicalLayer>,
    by_id: HashMap<u32, usize>,
    surfaces: HashMap<GeometryId, usize>,
    n_bins: usize,
}

impl GbtsGeometry {
    /// Group sensitive modules into logical layers.
    ///
    /// Modules outside the selection or without a mapping row are not
    /// used for seeding. Layers are ordered by logical layer id.
    pub fn build(
        geometry: &dyn TrackingGeometry,
        selection: &GeometrySelection,
        mapping: &LayerMapping,
        eta_bin_width: f64,
    ) -> Self {
        let mut extents: BTreeMap<u32, Extent> = BTreeMap::new();
        let mut members: Vec<(GeometryId, u32)> = Vec::new();
        for surface in geometry.sensitive_surfaces() {
            let id = surface.id();
            if !selection.selects(id) {
                continue;
            }
            let Some(code) = mapping.lookup(id) else {
                continue;
            };
            let combined = code.combined_id();
            let extent = extents.entry(combined).or_default();
            match *surface.bounds() {
                SurfaceBounds::Barrel {
                    radius, z, half_z, ..
                } => extent.add(
                    LayerKind::Barrel,
                    radius,
                    z - half_z,
                    z + half_z,
                    [eta(radius, z - half_z), eta(radius, z + half_z)],
                ),
                SurfaceBounds::Endcap { z, r, half_r, .. } => extent.add(
                    LayerKind::Endcap,
                    z,
                    r - half_r,
                    r + half_r,
                    [eta(r - half_r, z), eta(r + half_r, z)],
                ),
            }
            members.push((id, combined));
        }

        let mut layers = Vec::with_capacity(extents.len());
        let mut by_id = HashMap::with_capacity(extents.len());
        let mut n_bins = 0;
        for (id, extent) in extents {
            let bins = if eta_bin_width > 0.0 {
                (((extent.eta_max - extent.eta_min) / eta_bin_width).floor() as usize).max(1)
            } else {
                1
            };
            by_id.insert(id, layers.len());
            layers.push(LogicalLayer {
                id,
                kind: extent.kind.unwrap_or(LayerKind::Barrel),
                reference: extent.reference_sum / extent.count as f64,
                min_bound: extent.min_bound,
                max_bound: extent.max_bound,
                eta_min: extent.eta_min,
                eta_max: extent.eta_max,
                n_bins: bins,
                first_bin: n_bins,
            });
            n_bins += bins;
        }

        let surfaces = members
            .into_iter()
            .filter_map(|(surface, combined)| by_id.get(&combined).map(|&i| (surface, i)))
            .collect();
        Self {
            layers,
            by_id,
            surfaces,
            n_bins,
        }
    }

    pub fn layers(&self) -> &[LogicalLayer] {
        &self.layers
    }

    /// Position of a logical layer id in [`Self::layers`].
    pub fn layer_index(&self, id: u32) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    /// Logical layer of a module.
    pub fn layer_of(&self, surface: GeometryId) -> Option<usize> {
        self.surfaces.get(&surface).copied()
    }

    /// Total number of eta bins over all layers.
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gbts::tables::{LayerCode, SelectionEntry};
    use tracklab_detector::DetectorGeometry;

    fn pixel_mapping() -> LayerMapping {
        let mut mapping = LayerMapping::default();
        for (i, layer) in [2, 4, 6, 8].into_iter().enumerate() {
            mapping.insert(
                8,
                layer,
                0,
                LayerCode {
                    layer_id: 80 + i as u32,
                    eta_module: 0,
                },
            );
        }
        mapping.insert(
            9,
            2,
            0,
            LayerCode {
                layer_id: 90,
                eta_module: 0,
            },
        );
        mapping
    }

    #[test]
    fn test_barrel_layers_from_selection() {
        let geometry = DetectorGeometry::generic().unwrap();
        let selection = GeometrySelection::new(vec![SelectionEntry {
            volume: 8,
            layer: None,
            sensitive: None,
        }]);
        let layers = GbtsGeometry::build(&geometry, &selection, &pixel_mapping(), 0.2);

        // The disk is mapped but not selected.
        assert_eq!(layers.layers().len(), 4);
        let first = &layers.layers()[0];
        assert_eq!(first.id, 80_000);
        assert_eq!(first.kind, LayerKind::Barrel);
        assert!((first.reference - 32.0).abs() < 1e-9);
        assert!((first.min_bound + 500.0).abs() < 1e-9);
        assert!((first.max_bound - 500.0).abs() < 1e-9);
        assert!(first.eta_min < -3.0 && first.eta_max > 3.0);
        assert!(first.n_bins > 1);

        let second = &layers.layers()[1];
        assert_eq!(second.first_bin, first.n_bins);
        assert_eq!(
            layers.n_bins(),
            layers.layers().iter().map(|l| l.n_bins).sum::<usize>()
        );

        let surface = geometry.sensitive_surfaces()[0].id();
        assert_eq!(layers.layer_of(surface), layers.layer_index(80_000));
        assert!(layers.layer_of(GeometryId::new(9, 2, 1)).is_none());
    }

    #[test]
    fn test_endcap_layer_kind_and_bins() {
        let geometry = DetectorGeometry::generic().unwrap();
        let selection = GeometrySelection::new(vec![SelectionEntry {
            volume: 9,
            layer: Some(2),
            sensitive: None,
        }]);
        let layers = GbtsGeometry::build(&geometry, &selection, &pixel_mapping(), 10.0);
        assert_eq!(layers.layers().len(), 1);
        let disk = &layers.layers()[0];
        assert_eq!(disk.kind, LayerKind::Endcap);
        assert!((disk.reference - 600.0).abs() < 1e-9);
        // A bin wider than the layer still yields one bin.
        assert_eq!(disk.n_bins, 1);
        assert_eq!(disk.bin_of(100.0), 0);
    }

    #[test]
    fn test_bin_of_clamps() {
        let layer = LogicalLayer {
            id: 1,
            kind: LayerKind::Barrel,
            reference: 32.0,
            min_bound: -500.0,
            max_bound: 500.0,
            eta_min: -2.0,
            eta_max: 2.0,
            n_bins: 4,
            first_bin: 0,
        };
        assert_eq!(layer.bin_of(-5.0), 0);
        assert_eq!(layer.bin_of(-0.5), 1);
        assert_eq!(layer.bin_of(0.5), 2);
        assert_eq!(layer.bin_of(5.0), 3);
    }
}
