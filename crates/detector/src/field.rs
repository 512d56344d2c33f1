//! Magnetic field providers.

use crate::error::ResourceError;
use nalgebra::Vector3;
use std::path::Path;
use tracing::info;

/// Read-only magnetic field, in tesla.
pub trait MagneticField: Send + Sync {
    /// Field vector at a global position (mm).
    fn field_at(&self, position: &Vector3<f64>) -> Vector3<f64>;

    /// Longitudinal field component at a position.
    fn bz_at(&self, position: &Vector3<f64>) -> f64 {
        self.field_at(position).z
    }
}

/// Homogeneous field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantField {
    value: Vector3<f64>,
}

impl ConstantField {
    pub fn new(value: Vector3<f64>) -> Self {
        Self { value }
    }

    /// Solenoid field along the beam line.
    pub fn solenoid(bz: f64) -> Self {
        Self::new(Vector3::new(0.0, 0.0, bz))
    }
}

impl MagneticField for ConstantField {
    fn field_at(&self, _position: &Vector3<f64>) -> Vector3<f64> {
        self.value
    }
}

/// Axially symmetric field map on a regular r–z grid.
///
/// Values between grid nodes are interpolated bilinearly; outside the grid
/// the field is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct RzFieldMap {
    r_nodes: Vec<f64>,
    z_nodes: Vec<f64>,
    /// (Br, Bz) indexed as `[ir * z_nodes.len() + iz]`.
    values: Vec<(f64, f64)>,
}

impl RzFieldMap {
    /// Parse a CSV map with columns `r,z,br,bz` (mm, T).
    ///
    /// Blank lines, lines starting with `#` and a non-numeric header row
    /// are skipped. The rows must cover a complete rectangular grid.
    pub fn from_csv_str(input: &str) -> Result<Self, ResourceError> {
        let mut rows = Vec::new();
        for (number, line) in input.lines().enumerate() {
            let line_no = number + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = trimmed.split(',').map(str::trim).collect();
            if fields.len() != 4 {
                return Err(ResourceError::FieldMap {
                    line: line_no,
                    reason: format!("expected 4 columns, found {}", fields.len()),
                });
            }
            let parsed: Result<Vec<f64>, _> = fields.iter().map(|f| f.parse::<f64>()).collect();
            match parsed {
                Ok(values) => rows.push((line_no, values[0], values[1], values[2], values[3])),
                Err(_) if rows.is_empty() => continue,
                Err(e) => {
                    return Err(ResourceError::FieldMap {
                        line: line_no,
                        reason: e.to_string(),
                    })
                }
            }
        }

        if rows.is_empty() {
            return Err(ResourceError::FieldMap {
                line: 0,
                reason: "map contains no rows".to_string(),
            });
        }

        let r_nodes = unique_sorted(rows.iter().map(|row| row.1));
        let z_nodes = unique_sorted(rows.iter().map(|row| row.2));
        if r_nodes.len() < 2 || z_nodes.len() < 2 {
            return Err(ResourceError::FieldMap {
                line: 0,
                reason: "grid needs at least two nodes in r and z".to_string(),
            });
        }

        let mut values = vec![None; r_nodes.len() * z_nodes.len()];
        for (line, r, z, br, bz) in rows {
            let ir = position_of(&r_nodes, r);
            let iz = position_of(&z_nodes, z);
            let slot = &mut values[ir * z_nodes.len() + iz];
            if slot.is_some() {
                return Err(ResourceError::FieldMap {
                    line,
                    reason: format!("duplicate grid node r={r} z={z}"),
                });
            }
            *slot = Some((br, bz));
        }

        let values: Option<Vec<(f64, f64)>> = values.into_iter().collect();
        let values = values.ok_or_else(|| ResourceError::FieldMap {
            line: 0,
            reason: "grid is incomplete".to_string(),
        })?;

        info!(
            r_nodes = r_nodes.len(),
            z_nodes = z_nodes.len(),
            "Loaded r-z field map"
        );

        Ok(Self {
            r_nodes,
            z_nodes,
            values,
        })
    }

    /// Load a CSV map from disk.
    pub fn load(path: &Path) -> Result<Self, ResourceError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ResourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_csv_str(&contents)
    }

    fn value(&self, ir: usize, iz: usize) -> (f64, f64) {
        self.values[ir * self.z_nodes.len() + iz]
    }
}

impl MagneticField for RzFieldMap {
    fn field_at(&self, position: &Vector3<f64>) -> Vector3<f64> {
        let r = position.xy().norm();
        let z = position.z;
        let (Some((ir, fr)), Some((iz, fz))) = (cell(&self.r_nodes, r), cell(&self.z_nodes, z))
        else {
            return Vector3::zeros();
        };

        let (br00, bz00) = self.value(ir, iz);
        let (br01, bz01) = self.value(ir, iz + 1);
        let (br10, bz10) = self.value(ir + 1, iz);
        let (br11, bz11) = self.value(ir + 1, iz + 1);
        let lerp2 = |v00: f64, v01: f64, v10: f64, v11: f64| {
            let low = v00 * (1.0 - fz) + v01 * fz;
            let high = v10 * (1.0 - fz) + v11 * fz;
            low * (1.0 - fr) + high * fr
        };
        let br = lerp2(br00, br01, br10, br11);
        let bz = lerp2(bz00, bz01, bz10, bz11);

        if r > 0.0 {
            Vector3::new(br * position.x / r, br * position.y / r, bz)
        } else {
            Vector3::new(0.0, 0.0, bz)
        }
    }
}

fn unique_sorted(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut nodes: Vec<f64> = values.collect();
    nodes.sort_by(|a, b| a.total_cmp(b));
    nodes.dedup();
    nodes
}

fn position_of(nodes: &[f64], value: f64) -> usize {
    nodes.partition_point(|node| *node < value)
}

/// Lower node index and fractional offset of `value` within the grid.
fn cell(nodes: &[f64], value: f64) -> Option<(usize, f64)> {
    let first = *nodes.first()?;
    let last = *nodes.last()?;
    if !(value >= first && value <= last) {
        return None;
    }
    let upper = nodes.partition_point(|node| *node <= value).min(nodes.len() - 1);
    let lower = upper.saturating_sub(1);
    let fraction = (value - nodes[lower]) / (nodes[upper] - nodes[lower]);
    Some((lower, fraction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    const MAP: &str = "r,z,br,bz
0,-100,0,2.0
0,100,0,2.0
100,-100,0.1,1.0
100,100,-0.1,1.0
";

    #[test]
    fn test_interpolates_between_nodes() {
        let map = RzFieldMap::from_csv_str(MAP).unwrap();
        let field = map.field_at(&Vector3::new(50.0, 0.0, 0.0));
        assert_relative_eq!(field.z, 1.5, epsilon = 1e-12);
        assert_relative_eq!(field.x, 0.0, epsilon = 1e-12);

        let field = map.field_at(&Vector3::new(0.0, 100.0, -100.0));
        assert_relative_eq!(field.y, 0.1, epsilon = 1e-12);
        assert_relative_eq!(field.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_outside_grid_is_zero() {
        let map = RzFieldMap::from_csv_str(MAP).unwrap();
        assert_eq!(map.field_at(&Vector3::new(0.0, 0.0, 500.0)), Vector3::zeros());
    }

    #[test]
    fn test_incomplete_grid_rejected() {
        let result = RzFieldMap::from_csv_str("0,0,0,2\n0,1,0,2\n1,0,0,2\n");
        assert!(matches!(result, Err(ResourceError::FieldMap { .. })));
    }

    #[test]
    fn test_bad_row_reports_line() {
        let result = RzFieldMap::from_csv_str("0,0,0,2\n0,1,zero,2\n");
        match result {
            Err(ResourceError::FieldMap { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MAP.as_bytes()).unwrap();
        let map = RzFieldMap::load(file.path()).unwrap();
        assert_relative_eq!(map.bz_at(&Vector3::zeros()), 2.0, epsilon = 1e-12);

        let missing = RzFieldMap::load(Path::new("/nonexistent/field.csv"));
        assert!(matches!(missing, Err(ResourceError::Io { .. })));
    }

    #[test]
    fn test_constant_field() {
        let field = ConstantField::solenoid(2.0);
        assert_eq!(field.bz_at(&Vector3::new(1.0, 2.0, 3.0)), 2.0);
    }
}
