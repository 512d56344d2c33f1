//! Space point formation.

use tracklab_detector::TrackingGeometry;
use tracklab_types::{Measurement, SpacePoint};

/// Promote measurements to space points.
///
/// On barrel modules the second local coordinate is along z; on endcap
/// modules the first local coordinate is along r. Measurements on surfaces
/// unknown to the geometry are skipped.
pub fn space_points(
    measurements: &[Measurement],
    geometry: &dyn TrackingGeometry,
) -> Vec<SpacePoint> {
    measurements
        .iter()
        .filter_map(|m| {
            let surface = geometry.surface(m.surface)?;
            let (var_r, var_z) = if surface.is_barrel() {
                (0.0, m.var_loc1())
            } else {
                (m.var_loc0(), 0.0)
            };
            Some(SpacePoint {
                measurement: m.index,
                surface: m.surface,
                position: m.global,
                var_r,
                var_z,
            })
        })
        .collect()
}
