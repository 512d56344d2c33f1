//! Helical trajectories in a solenoidal field.
//!
//! A [`Helix`] is parameterised by its three-dimensional path length `l`
//! from the starting point. In the transverse plane it is a circle of
//! radius `pT / (c |q Bz|)`; neutral particles, a vanishing field or a
//! purely longitudinal direction degrade to a straight line.

use nalgebra::{Vector2, Vector3};
use std::f64::consts::TAU;
use tracklab_types::kinematics::bending_radius;

/// Intersections closer than this (mm) are treated as the starting point.
pub const MIN_STEP: f64 = 1e-3;

/// Radii beyond this (mm) are propagated as straight lines.
const MAX_RADIUS: f64 = 1e9;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Circle {
    center: Vector2<f64>,
    radius: f64,
    /// +1 for counter-clockwise motion, -1 for clockwise.
    sense: f64,
    alpha0: f64,
}

/// A charged or neutral trajectory through a uniform longitudinal field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Helix {
    origin: Vector3<f64>,
    direction: Vector3<f64>,
    phi0: f64,
    sin_theta: f64,
    cos_theta: f64,
    momentum: f64,
    charge: f64,
    circle: Option<Circle>,
}

impl Helix {
    /// Create a helix starting at `origin` with the given direction of
    /// flight, absolute momentum (GeV), charge (e) and field `bz` (T).
    pub fn new(
        origin: Vector3<f64>,
        direction: Vector3<f64>,
        momentum: f64,
        charge: f64,
        bz: f64,
    ) -> Self {
        let direction = direction.try_normalize(1e-12).unwrap_or_else(Vector3::z);
        let sin_theta = direction.xy().norm();
        let cos_theta = direction.z;
        let phi0 = direction.y.atan2(direction.x);

        let circle = if sin_theta > 1e-12 {
            bending_radius(momentum * sin_theta, charge, bz)
                .filter(|radius| radius.is_finite() && *radius < MAX_RADIUS)
                .map(|radius| {
                    let sense = -(charge * bz).signum();
                    let center = Vector2::new(
                        origin.x - sense * radius * phi0.sin(),
                        origin.y + sense * radius * phi0.cos(),
                    );
                    let alpha0 = (origin.y - center.y).atan2(origin.x - center.x);
                    Circle {
                        center,
                        radius,
                        sense,
                        alpha0,
                    }
                })
        } else {
            None
        };

        Self {
            origin,
            direction,
            phi0,
            sin_theta,
            cos_theta,
            momentum,
            charge,
            circle,
        }
    }

    pub fn origin(&self) -> Vector3<f64> {
        self.origin
    }

    pub fn momentum(&self) -> f64 {
        self.momentum
    }

    pub fn charge(&self) -> f64 {
        self.charge
    }

    /// Transverse bending radius, `None` for straight lines.
    pub fn radius(&self) -> Option<f64> {
        self.circle.map(|c| c.radius)
    }

    /// Centre of the transverse circle, `None` for straight lines.
    pub fn center(&self) -> Option<Vector2<f64>> {
        self.circle.map(|c| c.center)
    }

    /// Position after a path length `l`.
    pub fn position_at(&self, l: f64) -> Vector3<f64> {
        match self.circle {
            Some(c) => {
                let s = l * self.sin_theta;
                let alpha = c.alpha0 + c.sense * s / c.radius;
                Vector3::new(
                    c.center.x + c.radius * alpha.cos(),
                    c.center.y + c.radius * alpha.sin(),
                    self.origin.z + l * self.cos_theta,
                )
            }
            None => self.origin + self.direction * l,
        }
    }

    /// Unit direction of flight after a path length `l`.
    pub fn direction_at(&self, l: f64) -> Vector3<f64> {
        match self.circle {
            Some(c) => {
                let phi = self.phi0 + c.sense * l * self.sin_theta / c.radius;
                Vector3::new(
                    self.sin_theta * phi.cos(),
                    self.sin_theta * phi.sin(),
                    self.cos_theta,
                )
            }
            None => self.direction,
        }
    }

    /// Path length to the nearest forward crossing of the cylinder of
    /// radius `radius` around the beam line.
    pub fn intersect_cylinder(&self, radius: f64) -> Option<f64> {
        if self.sin_theta < 1e-12 {
            return None;
        }
        let s = match self.circle {
            Some(c) => self.circle_crossing(&c, radius)?,
            None => self.line_crossing(radius)?,
        };
        Some(s / self.sin_theta)
    }

    /// Path length to the forward crossing of the plane at `z`.
    pub fn intersect_plane(&self, z: f64) -> Option<f64> {
        if self.cos_theta.abs() < 1e-12 {
            return None;
        }
        let l = (z - self.origin.z) / self.cos_theta;
        (l > MIN_STEP).then_some(l)
    }

    fn circle_crossing(&self, c: &Circle, radius: f64) -> Option<f64> {
        let d = c.center.norm();
        if d < 1e-9 {
            return None;
        }
        let cos_delta = (radius * radius - d * d - c.radius * c.radius) / (2.0 * c.radius * d);
        if cos_delta.abs() > 1.0 {
            return None;
        }
        let beta = c.center.y.atan2(c.center.x);
        let delta = cos_delta.acos();
        [beta + delta, beta - delta]
            .into_iter()
            .map(|alpha| c.radius * (c.sense * (alpha - c.alpha0)).rem_euclid(TAU))
            .filter(|s| *s > MIN_STEP)
            .min_by(|a, b| a.total_cmp(b))
    }

    fn line_crossing(&self, radius: f64) -> Option<f64> {
        let start = self.origin.xy();
        let unit = Vector2::new(self.phi0.cos(), self.phi0.sin());
        let b = start.dot(&unit);
        let c = start.norm_squared() - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let root = discriminant.sqrt();
        [-b - root, -b + root]
            .into_iter()
            .filter(|s| *s > MIN_STEP)
            .min_by(|a, b| a.total_cmp(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_straight_line_crossing() {
        let helix = Helix::new(Vector3::zeros(), Vector3::new(1.0, 0.0, 1.0), 5.0, 0.0, 2.0);
        assert!(helix.radius().is_none());
        let l = helix.intersect_cylinder(100.0).unwrap();
        let position = helix.position_at(l);
        assert_relative_eq!(position.xy().norm(), 100.0, epsilon = 1e-9);
        assert_relative_eq!(position.z, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_helix_reaches_cylinder_radius() {
        let helix = Helix::new(Vector3::zeros(), Vector3::new(0.0, 1.0, 0.3), 1.0, 1.0, 2.0);
        let l = helix.intersect_cylinder(300.0).unwrap();
        let position = helix.position_at(l);
        assert_relative_eq!(position.xy().norm(), 300.0, epsilon = 1e-6);
        // Positive charge in a positive field bends clockwise.
        assert!(position.x > 0.0);
    }

    #[test]
    fn test_helix_direction_is_tangent() {
        let helix = Helix::new(
            Vector3::new(10.0, -5.0, 3.0),
            Vector3::new(0.6, 0.8, -0.2),
            0.8,
            -1.0,
            2.0,
        );
        let l = 250.0;
        let step = 1e-4;
        let numeric = (helix.position_at(l + step) - helix.position_at(l - step)) / (2.0 * step);
        let analytic = helix.direction_at(l);
        assert_relative_eq!(numeric, analytic, epsilon = 1e-6);
        assert_relative_eq!(analytic.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_low_momentum_loops_inside() {
        // Radius of about 33 mm never reaches 100 mm from the origin.
        let helix = Helix::new(Vector3::zeros(), Vector3::x(), 0.02, 1.0, 2.0);
        assert!(helix.intersect_cylinder(100.0).is_none());
        assert!(helix.intersect_cylinder(40.0).is_some());
    }

    #[test]
    fn test_plane_crossing_is_forward_only() {
        let helix = Helix::new(Vector3::zeros(), Vector3::new(0.1, 0.0, 1.0), 2.0, 1.0, 2.0);
        assert!(helix.intersect_plane(500.0).is_some());
        assert!(helix.intersect_plane(-500.0).is_none());
        let l = helix.intersect_plane(500.0).unwrap();
        assert_relative_eq!(helix.position_at(l).z, 500.0, epsilon = 1e-9);
    }
}
