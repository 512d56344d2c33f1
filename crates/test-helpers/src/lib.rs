//! Test fixtures for tracklab.
//!
//! Provides configuration tables matching the generic detector
//! (`DetectorGeometry::generic`) and synthetic track data with exact
//! positions, so stage tests do not depend on simulation or smearing.

use tracklab_detector::{Helix, TrackingGeometry};
use tracklab_types::kinematics::theta_from_eta;
use tracklab_types::{Matrix2, Measurement, MeasurementIndex, SpacePoint, Vector3};

/// Smearing configuration covering every sensitive surface of the generic
/// detector.
pub const GENERIC_SMEARING: &str = r#"{
    "regions": [
        {"volume": 7,
         "loc0": {"model": "gauss", "stddev": 0.05},
         "loc1": {"model": "gauss", "stddev": 0.01}},
        {"volume": 8,
         "loc0": {"model": "gauss", "stddev": 0.01},
         "loc1": {"model": "gauss", "stddev": 0.05}},
        {"volume": 9,
         "loc0": {"model": "gauss", "stddev": 0.05},
         "loc1": {"model": "gauss", "stddev": 0.01}},
        {"volume": 13,
         "loc0": {"model": "gauss", "stddev": 0.04},
         "loc1": {"model": "gauss_clipped", "stddev": 0.5, "min": -1100.0, "max": 1100.0}}
    ]
}"#;

/// Graph seeding restricted to the pixel detector.
pub const GBTS_GEOMETRY_SELECTION: &str = r#"{
    "geometry-selection": [
        {"volume": 7},
        {"volume": 8},
        {"volume": 9}
    ]
}"#;

/// One logical layer per pixel barrel layer and disk.
pub const GBTS_LAYER_MAPPING: &str = "\
volume,layer,module,z,r,gbts_id,eta_mod
8,2,0,0,32,80,0
8,4,0,0,72,81,0
8,6,0,0,116,82,0
8,8,0,0,172,83,0
7,2,0,-600,100,70,0
7,4,0,-700,100,71,0
7,6,0,-820,100,72,0
7,8,0,-960,100,73,0
7,10,0,-1100,100,74,0
9,2,0,600,100,90,0
9,4,0,700,100,91,0
9,6,0,820,100,92,0
9,8,0,960,100,93,0
9,10,0,1100,100,94,0
";

/// Adjacent barrel layers, every barrel layer to the first disk on each
/// side, and adjacent disks. All bin pairs are enabled.
pub const GBTS_CONNECTOR: &str = "\
19 0.2
0 1 81000 80000 1 1 1
1
1 1 82000 81000 1 1 1
1
2 1 83000 82000 1 1 1
1
3 2 90000 80000 1 1 1
1
4 2 90000 81000 1 1 1
1
5 2 90000 82000 1 1 1
1
6 2 90000 83000 1 1 1
1
7 2 70000 80000 1 1 1
1
8 2 70000 81000 1 1 1
1
9 2 70000 82000 1 1 1
1
10 2 70000 83000 1 1 1
1
11 3 91000 90000 1 1 1
1
12 3 92000 91000 1 1 1
1
13 3 93000 92000 1 1 1
1
14 3 94000 93000 1 1 1
1
15 3 71000 70000 1 1 1
1
16 3 72000 71000 1 1 1
1
17 3 73000 72000 1 1 1
1
18 3 74000 73000 1 1 1
1
";

/// Geometry selection, layer mapping and connection table, in that order.
pub fn gbts_tables() -> (&'static str, &'static str, &'static str) {
    (GBTS_GEOMETRY_SELECTION, GBTS_LAYER_MAPPING, GBTS_CONNECTOR)
}

/// Pixel barrel radii of the generic detector.
const PIXEL_BARREL: [(u32, f64); 4] = [(2, 32.0), (4, 72.0), (6, 116.0), (8, 172.0)];

/// Exact measurements of an infinitely stiff track from `(0, 0, z0)` on the
/// pixel barrel layers, one per layer, numbered from the innermost.
pub fn straight_track_measurements(
    geometry: &dyn TrackingGeometry,
    cot_theta: f64,
    phi: f64,
    z0: f64,
) -> Vec<Measurement> {
    PIXEL_BARREL
        .iter()
        .filter_map(|&(layer, r)| {
            let position = Vector3::new(r * phi.cos(), r * phi.sin(), z0 + r * cot_theta);
            let layer = geometry.layer(tracklab_types::RegionId::new(8, layer))?;
            let surface = layer.surface_at(&position)?;
            Some((surface.id(), surface.global_to_local(&position), position))
        })
        .enumerate()
        .map(|(i, (surface, local, global))| Measurement {
            index: MeasurementIndex(i as u32),
            surface,
            local,
            covariance: Matrix2::new(1e-4, 0.0, 0.0, 2.5e-3),
            global,
            hits: Vec::new(),
        })
        .collect()
}

/// Space points of [`straight_track_measurements`].
pub fn straight_track_points(
    geometry: &dyn TrackingGeometry,
    cot_theta: f64,
    phi: f64,
    z0: f64,
) -> Vec<SpacePoint> {
    straight_track_measurements(geometry, cot_theta, phi, z0)
        .into_iter()
        .map(|m| SpacePoint {
            measurement: m.index,
            surface: m.surface,
            position: m.global,
            var_r: 0.0,
            var_z: m.var_loc1(),
        })
        .collect()
}

/// Exact measurements of a helix from `(0, 0, z0)` on every sensitive
/// layer it crosses, numbered from `first_index` in crossing order.
#[allow(clippy::too_many_arguments)]
pub fn helix_track_measurements(
    geometry: &dyn TrackingGeometry,
    bz: f64,
    pt: f64,
    eta: f64,
    phi: f64,
    charge: f64,
    z0: f64,
    first_index: u32,
) -> Vec<Measurement> {
    let theta = theta_from_eta(eta);
    let direction = Vector3::new(phi.cos() * theta.sin(), phi.sin() * theta.sin(), theta.cos());
    let momentum = pt / theta.sin();
    let mut position = Vector3::new(0.0, 0.0, z0);
    let mut direction = direction;
    let mut measurements = Vec::new();

    for _ in 0..64 {
        let helix = Helix::new(position, direction, momentum, charge, bz);
        let Some(crossing) = geometry.next_crossing(&helix) else {
            break;
        };
        position = crossing.position;
        direction = crossing.direction;
        if let Some(surface) = geometry.layers()[crossing.layer].surface_at(&position) {
            measurements.push(Measurement {
                index: MeasurementIndex(first_index + measurements.len() as u32),
                surface: surface.id(),
                local: surface.global_to_local(&position),
                covariance: Matrix2::new(1e-4, 0.0, 0.0, 2.5e-3),
                global: position,
                hits: Vec::new(),
            });
        }
    }
    measurements
}
