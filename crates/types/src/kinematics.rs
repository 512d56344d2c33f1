//! Unit conventions and kinematic helpers.
//!
//! Lengths are in millimetres, momenta and energies in GeV, magnetic field
//! in tesla and time in nanoseconds.

use std::f64::consts::PI;

/// Transverse momentum in GeV per tesla per millimetre of bending radius.
pub const CURVATURE_CONSTANT: f64 = 0.299_792_458e-3;

/// Muon mass in GeV.
pub const MUON_MASS: f64 = 0.105_658_4;

/// Charged pion mass in GeV.
pub const PION_MASS: f64 = 0.139_570_4;

/// Polar angle for a pseudorapidity.
pub fn theta_from_eta(eta: f64) -> f64 {
    2.0 * (-eta).exp().atan()
}

/// Pseudorapidity for a polar angle.
pub fn eta_from_theta(theta: f64) -> f64 {
    -(theta / 2.0).tan().ln()
}

/// Pseudorapidity of a direction or position given its transverse and
/// longitudinal components.
pub fn eta_from_components(transverse: f64, longitudinal: f64) -> f64 {
    (longitudinal / transverse).asinh()
}

/// Wrap an angle into `[-pi, pi)`.
pub fn wrap_phi(phi: f64) -> f64 {
    let wrapped = (phi + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped >= PI {
        wrapped - 2.0 * PI
    } else {
        wrapped
    }
}

/// Bending radius in mm of a particle with transverse momentum `pt` (GeV)
/// and charge `charge` (e) in a field `bz` (T).
///
/// Returns `None` for neutral particles or a vanishing field.
pub fn bending_radius(pt: f64, charge: f64, bz: f64) -> Option<f64> {
    let denominator = CURVATURE_CONSTANT * (charge * bz).abs();
    if denominator < f64::EPSILON {
        return None;
    }
    Some(pt / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_eta_theta_inverse() {
        for eta in [-4.0, -1.5, 0.0, 0.7, 3.9] {
            assert_relative_eq!(eta_from_theta(theta_from_eta(eta)), eta, epsilon = 1e-9);
        }
        assert_relative_eq!(theta_from_eta(0.0), PI / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_wrap_phi_range() {
        assert_relative_eq!(wrap_phi(3.0 * PI / 2.0), -PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(wrap_phi(-3.0 * PI / 2.0), PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(wrap_phi(0.3), 0.3, epsilon = 1e-12);
        assert!(wrap_phi(PI) < PI);
    }

    #[test]
    fn test_one_gev_in_two_tesla() {
        let radius = bending_radius(1.0, 1.0, 2.0).unwrap();
        assert_relative_eq!(radius, 1667.8, epsilon = 0.1);
        assert!(bending_radius(1.0, 0.0, 2.0).is_none());
        assert!(bending_radius(1.0, 1.0, 0.0).is_none());
    }
}
