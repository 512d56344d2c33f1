//! Material interactions at layer crossings.

use rand::Rng;
use tracklab_core::random::sample_gaussian;
use tracklab_types::Vector3;

/// Mean energy loss per radiation length of silicon for a minimum-ionising
/// particle (GeV).
const ENERGY_LOSS_PER_X0: f64 = 0.0363;

/// Width of the projected scattering angle distribution (rad), Highland
/// formula.
pub fn highland_theta0(momentum: f64, mass: f64, charge: f64, x_over_x0: f64) -> f64 {
    if momentum <= 0.0 || x_over_x0 <= 0.0 {
        return 0.0;
    }
    let energy = (momentum * momentum + mass * mass).sqrt();
    let beta = momentum / energy;
    let q2 = charge * charge;
    let log_term = 1.0 + 0.038 * (x_over_x0 * q2 / (beta * beta)).ln();
    (13.6e-3 / (beta * momentum)) * charge.abs() * x_over_x0.sqrt() * log_term.max(0.0)
}

/// Deflect `direction` by two independent Gaussian projected angles.
pub fn scatter(rng: &mut impl Rng, direction: &Vector3<f64>, theta0: f64) -> Vector3<f64> {
    if theta0 <= 0.0 {
        return *direction;
    }
    let helper = if direction.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let u = direction.cross(&helper).normalize();
    let v = direction.cross(&u);
    let a = sample_gaussian(rng, 0.0, theta0);
    let b = sample_gaussian(rng, 0.0, theta0);
    (direction + u * a.tan() + v * b.tan()).normalize()
}

/// Momentum after traversing `x_over_x0`, `None` if the particle stops.
pub fn energy_loss(momentum: f64, mass: f64, x_over_x0: f64) -> Option<f64> {
    let energy = (momentum * momentum + mass * mass).sqrt() - ENERGY_LOSS_PER_X0 * x_over_x0;
    (energy > mass).then(|| (energy * energy - mass * mass).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;

    #[test]
    fn test_highland_scales_with_momentum() {
        let low = highland_theta0(1.0, 0.1057, -1.0, 0.01);
        let high = highland_theta0(10.0, 0.1057, -1.0, 0.01);
        assert!(low > 0.0);
        assert_relative_eq!(low / high, 10.0, max_relative = 0.01);
        assert_eq!(highland_theta0(1.0, 0.1057, -1.0, 0.0), 0.0);
    }

    #[test]
    fn test_scatter_keeps_unit_length() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(1);
        let direction = Vector3::new(0.6, 0.0, 0.8);
        let scattered = scatter(&mut rng, &direction, 0.01);
        assert_relative_eq!(scattered.norm(), 1.0, epsilon = 1e-12);
        assert!(scattered.dot(&direction) > 0.99);
        assert_eq!(scatter(&mut rng, &direction, 0.0), direction);
    }

    #[test]
    fn test_energy_loss_stops_slow_particles() {
        let p = energy_loss(1.0, 0.1057, 0.1).unwrap();
        assert!(p < 1.0);
        assert!(energy_loss(0.01, 0.1057, 1.0).is_none());
    }
}
