//! Helix fit: a circle in the transverse plane and a straight line in
//! transverse arc length versus z.

use nalgebra::{Matrix3, Vector2, Vector3};
use tracklab_types::kinematics::{wrap_phi, CURVATURE_CONSTANT};
use tracklab_types::TrackParameters;

/// Circles larger than this (mm) are fitted as straight lines.
const MAX_RADIUS: f64 = 1e7;

/// Largest distance (mm) from the first-to-last chord for a straight fit.
const COLLINEAR_TOLERANCE: f64 = 1e-6;

/// A measured point with its uncertainties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitPoint {
    pub position: Vector3<f64>,
    /// Variance perpendicular to the track in the transverse plane.
    pub var_transverse: f64,
    /// Variance along z.
    pub var_longitudinal: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Transverse {
    Circle {
        center: Vector2<f64>,
        radius: f64,
        /// +1 for counter-clockwise motion, -1 for clockwise.
        sense: f64,
    },
    Line,
}

/// Result of [`fit_helix`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HelixFit {
    transverse: Transverse,
    /// Point of closest approach to the beam line.
    perigee: Vector2<f64>,
    /// Transverse direction of flight at the perigee.
    tangent: Vector2<f64>,
    z0: f64,
    cot_theta: f64,
    pub chi2: f64,
    pub ndf: u32,
}

/// Fit a helix through `points`, ordered along the direction of flight.
///
/// The transverse circle is an algebraic least-squares fit on centred
/// coordinates; nearly collinear points give a straight line. `None` if
/// fewer than three points are given or the points are degenerate.
pub fn fit_helix(points: &[FitPoint]) -> Option<HelixFit> {
    if points.len() < 3 {
        return None;
    }
    let (first, last) = (points.first()?.position.xy(), points.last()?.position.xy());

    let chord = (last - first).try_normalize(1e-9)?;
    let collinear = points.iter().all(|p| {
        let offset = p.position.xy() - first;
        (offset.x * chord.y - offset.y * chord.x).abs() < COLLINEAR_TOLERANCE
    });
    let circle = if collinear { None } else { fit_circle(points) };

    let (transverse, perigee, tangent) = match circle {
        Some((center, radius)) if radius < MAX_RADIUS => {
            let distance = center.norm();
            if distance < 1e-9 {
                return None;
            }
            let start = wrap_phi((first - center).y.atan2((first - center).x));
            let end = wrap_phi((last - center).y.atan2((last - center).x));
            let sense = if wrap_phi(end - start) >= 0.0 { 1.0 } else { -1.0 };
            let perigee = center * (1.0 - radius / distance);
            let radial = -center / distance;
            let tangent = Vector2::new(-radial.y, radial.x) * sense;
            (
                Transverse::Circle {
                    center,
                    radius,
                    sense,
                },
                perigee,
                tangent,
            )
        }
        _ => {
            let perigee = first - chord * first.dot(&chord);
            (Transverse::Line, perigee, chord)
        }
    };

    let mut fit = HelixFit {
        transverse,
        perigee,
        tangent,
        z0: 0.0,
        cot_theta: 0.0,
        chi2: 0.0,
        ndf: 0,
    };

    // Straight line z = z0 + s cot θ.
    let n = points.len() as f64;
    let (mut sum_s, mut sum_z, mut sum_ss, mut sum_sz) = (0.0, 0.0, 0.0, 0.0);
    for point in points {
        let s = fit.arc_length(&point.position.xy());
        sum_s += s;
        sum_z += point.position.z;
        sum_ss += s * s;
        sum_sz += s * point.position.z;
    }
    let denominator = n * sum_ss - sum_s * sum_s;
    if denominator.abs() < 1e-9 {
        return None;
    }
    fit.cot_theta = (n * sum_sz - sum_s * sum_z) / denominator;
    fit.z0 = (sum_z - fit.cot_theta * sum_s) / n;

    for point in points {
        let (transverse, longitudinal) = fit.residuals(&point.position);
        fit.chi2 += transverse * transverse / point.var_transverse.max(f64::EPSILON)
            + longitudinal * longitudinal / point.var_longitudinal.max(f64::EPSILON);
    }
    fit.ndf = (2 * points.len()).saturating_sub(5).max(1) as u32;
    Some(fit)
}

/// Algebraic circle fit on coordinates centred at the mean.
fn fit_circle(points: &[FitPoint]) -> Option<(Vector2<f64>, f64)> {
    let n = points.len() as f64;
    let mean = points
        .iter()
        .fold(Vector2::zeros(), |sum, p| sum + p.position.xy())
        / n;

    let mut normal = Matrix3::zeros();
    let mut rhs = Vector3::zeros();
    for point in points {
        let u = point.position.xy() - mean;
        let row = Vector3::new(u.x, u.y, 1.0);
        normal += row * row.transpose();
        rhs -= row * u.norm_squared();
    }
    let solution = normal.lu().solve(&rhs)?;
    let center = Vector2::new(-solution[0] / 2.0, -solution[1] / 2.0);
    let radius_squared = center.norm_squared() - solution[2];
    if !(radius_squared > 0.0) || !radius_squared.is_finite() {
        return None;
    }
    Some((center + mean, radius_squared.sqrt()))
}

impl HelixFit {
    /// Transverse path length from the perigee to the point nearest `xy`.
    pub fn arc_length(&self, xy: &Vector2<f64>) -> f64 {
        match self.transverse {
            Transverse::Circle {
                center,
                radius,
                sense,
            } => {
                let from = self.perigee - center;
                let to = xy - center;
                let angle = wrap_phi(to.y.atan2(to.x) - from.y.atan2(from.x));
                radius * sense * angle
            }
            Transverse::Line => (xy - self.perigee).dot(&self.tangent),
        }
    }

    /// Transverse and longitudinal distance of a point from the helix.
    pub fn residuals(&self, position: &Vector3<f64>) -> (f64, f64) {
        let xy = position.xy();
        let transverse = match self.transverse {
            Transverse::Circle { center, radius, .. } => (xy - center).norm() - radius,
            Transverse::Line => {
                let offset = xy - self.perigee;
                offset.x * self.tangent.y - offset.y * self.tangent.x
            }
        };
        let longitudinal = position.z - (self.z0 + self.cot_theta * self.arc_length(&xy));
        (transverse, longitudinal)
    }

    /// Unit direction of flight at the point of the helix nearest
    /// `position`.
    pub fn direction_at(&self, position: &Vector3<f64>) -> Vector3<f64> {
        let tangent = match self.transverse {
            Transverse::Circle { center, sense, .. } => {
                let radial = (position.xy() - center)
                    .try_normalize(1e-12)
                    .unwrap_or(self.tangent);
                Vector2::new(-radial.y, radial.x) * sense
            }
            Transverse::Line => self.tangent,
        };
        Vector3::new(tangent.x, tangent.y, self.cot_theta).normalize()
    }

    pub fn is_straight(&self) -> bool {
        matches!(self.transverse, Transverse::Line)
    }

    pub fn theta(&self) -> f64 {
        std::f64::consts::FRAC_PI_2 - self.cot_theta.atan()
    }

    /// Transverse momentum in a field `bz` (T); infinite for straight fits.
    pub fn pt(&self, bz: f64) -> f64 {
        match self.transverse {
            Transverse::Circle { radius, .. } if bz != 0.0 => {
                CURVATURE_CONSTANT * bz.abs() * radius
            }
            _ => f64::INFINITY,
        }
    }

    /// Charge sign implied by the bending direction in a field `bz`.
    pub fn charge(&self, bz: f64) -> f64 {
        match self.transverse {
            // Positive charges turn clockwise in a positive field.
            Transverse::Circle { sense, .. } if bz != 0.0 => -sense * bz.signum(),
            _ => 0.0,
        }
    }

    /// Perigee parameters in a field `bz` (T).
    pub fn parameters(&self, bz: f64) -> TrackParameters {
        let theta = self.theta();
        let p = self.pt(bz) / theta.sin();
        let q_over_p = if p.is_finite() && p > 0.0 {
            self.charge(bz) / p
        } else {
            0.0
        };
        TrackParameters {
            d0: self.perigee.x * self.tangent.y - self.perigee.y * self.tangent.x,
            z0: self.z0,
            phi: self.tangent.y.atan2(self.tangent.x),
            theta,
            q_over_p,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tracklab_detector::DetectorGeometry;
    use tracklab_test_helpers::helix_track_measurements;

    fn points(positions: &[Vector3<f64>]) -> Vec<FitPoint> {
        positions
            .iter()
            .map(|&position| FitPoint {
                position,
                var_transverse: 1e-4,
                var_longitudinal: 2.5e-3,
            })
            .collect()
    }

    #[test]
    fn test_fit_recovers_helix_parameters() {
        let geometry = DetectorGeometry::generic().unwrap();
        let track = helix_track_measurements(&geometry, 2.0, 2.0, 0.5, 0.7, 1.0, 10.0, 0);
        assert_eq!(track.len(), 9);
        let positions: Vec<_> = track.iter().map(|m| m.global).collect();
        let fit = fit_helix(&points(&positions)).unwrap();
        let parameters = fit.parameters(2.0);

        assert!(!fit.is_straight());
        assert_relative_eq!(parameters.pt(), 2.0, max_relative = 1e-6);
        assert_relative_eq!(parameters.eta(), 0.5, epsilon = 1e-6);
        assert_relative_eq!(parameters.z0, 10.0, epsilon = 1e-6);
        assert_relative_eq!(parameters.phi, 0.7, epsilon = 1e-6);
        assert_relative_eq!(parameters.d0, 0.0, epsilon = 1e-6);
        assert_eq!(parameters.charge(), 1.0);
        assert!(fit.chi2 < 1e-6);
        assert_eq!(fit.ndf, 13);
    }

    #[test]
    fn test_negative_charge_bends_the_other_way() {
        let geometry = DetectorGeometry::generic().unwrap();
        let track = helix_track_measurements(&geometry, 2.0, 1.0, -0.3, -2.0, -1.0, 0.0, 0);
        let positions: Vec<_> = track.iter().map(|m| m.global).collect();
        let fit = fit_helix(&points(&positions[..4])).unwrap();
        assert_eq!(fit.charge(2.0), -1.0);
        assert_relative_eq!(fit.pt(2.0), 1.0, max_relative = 1e-6);
    }

    #[test]
    fn test_collinear_points_fit_a_line() {
        let positions = [
            Vector3::new(32.0, 32.0, 5.0),
            Vector3::new(72.0, 72.0, 10.0),
            Vector3::new(116.0, 116.0, 15.5),
        ];
        let fit = fit_helix(&points(&positions)).unwrap();
        assert!(fit.is_straight());
        let parameters = fit.parameters(2.0);
        assert_eq!(parameters.q_over_p, 0.0);
        assert_relative_eq!(parameters.phi, std::f64::consts::FRAC_PI_4, epsilon = 1e-9);
        assert_relative_eq!(parameters.d0, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_direction_points_along_flight() {
        let geometry = DetectorGeometry::generic().unwrap();
        let track = helix_track_measurements(&geometry, 2.0, 1.5, 0.0, 0.0, 1.0, 0.0, 0);
        let positions: Vec<_> = track.iter().map(|m| m.global).collect();
        let fit = fit_helix(&points(&positions[..3])).unwrap();
        let direction = fit.direction_at(&positions[2]);
        let chord = (positions[3] - positions[2]).normalize();
        assert!(direction.dot(&chord) > 0.99);
    }

    #[test]
    fn test_too_few_points() {
        let positions = [Vector3::new(32.0, 0.0, 0.0), Vector3::new(72.0, 0.0, 0.0)];
        assert!(fit_helix(&points(&positions)).is_none());
    }
}
