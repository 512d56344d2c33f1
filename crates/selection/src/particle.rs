//! Particle selection criteria.

use crate::range::{CountRange, Range};
use crate::Criteria;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracklab_core::ConfigError;
use tracklab_types::{ParticleId, ParticleRecord};

/// Required sign of the charge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeSign {
    Positive,
    Negative,
}

impl ChargeSign {
    pub fn matches(&self, charge: f64) -> bool {
        match self {
            ChargeSign::Positive => charge > 0.0,
            ChargeSign::Negative => charge < 0.0,
        }
    }
}

/// Criteria on truth particles. Every set criterion must pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleCriteria {
    /// Transverse distance of the production vertex from the beam line (mm).
    pub rho: Range,
    /// Absolute longitudinal position of the production vertex (mm).
    pub abs_z: Range,
    pub phi: Range,
    pub eta: Range,
    pub abs_eta: Range,
    /// Transverse momentum (GeV).
    pub pt: Range,
    /// Number of measurements the particle contributed to.
    pub measurements: CountRange,
    pub remove_charged: bool,
    pub remove_neutral: bool,
    pub remove_pile_up: bool,
    pub charge: Option<ChargeSign>,
}

impl ParticleCriteria {
    /// Set the transverse momentum range.
    pub fn with_pt(mut self, pt: Range) -> Self {
        self.pt = pt;
        self
    }

    /// Set the pseudorapidity range.
    pub fn with_eta(mut self, eta: Range) -> Self {
        self.eta = eta;
        self
    }

    /// Set the absolute pseudorapidity range.
    pub fn with_abs_eta(mut self, abs_eta: Range) -> Self {
        self.abs_eta = abs_eta;
        self
    }

    /// Set the vertex position ranges.
    pub fn with_vertex(mut self, rho: Range, abs_z: Range) -> Self {
        self.rho = rho;
        self.abs_z = abs_z;
        self
    }

    /// Require at least `min` measurements.
    pub fn with_min_measurements(mut self, min: usize) -> Self {
        self.measurements = CountRange::at_least(min);
        self
    }

    /// Drop neutral particles.
    pub fn without_neutral(mut self) -> Self {
        self.remove_neutral = true;
        self
    }

    /// Drop pile-up particles.
    pub fn without_pile_up(mut self) -> Self {
        self.remove_pile_up = true;
        self
    }

    /// Keep only one charge sign.
    pub fn with_charge(mut self, sign: ChargeSign) -> Self {
        self.charge = Some(sign);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rho.validate("rho")?;
        self.abs_z.validate("abs_z")?;
        self.phi.validate("phi")?;
        self.eta.validate("eta")?;
        self.abs_eta.validate("abs_eta")?;
        self.pt.validate("pt")?;
        self.measurements.validate("measurements")
    }

    /// Whether the criteria depend on measurement counts.
    pub fn uses_measurements(&self) -> bool {
        !self.measurements.is_unbounded()
    }

    /// Whether the criteria accept everything.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Evaluate all criteria for a particle with `measurements` measurements.
    pub fn accepts(&self, particle: &ParticleRecord, measurements: usize) -> bool {
        let eta = particle.eta();
        self.rho.contains(particle.rho())
            && self.abs_z.contains(particle.abs_z())
            && self.phi.contains(particle.phi())
            && self.eta.contains(eta)
            && self.abs_eta.contains(eta.abs())
            && self.pt.contains(particle.pt())
            && self.measurements.contains(measurements)
            && !(self.remove_charged && particle.is_charged())
            && !(self.remove_neutral && !particle.is_charged())
            && !(self.remove_pile_up && particle.is_pile_up())
            && self.charge.map_or(true, |sign| sign.matches(particle.charge))
    }
}

/// Particle criteria bound to the event's measurement counts.
pub struct ParticleSelector<'a> {
    criteria: &'a ParticleCriteria,
    counts: Option<&'a HashMap<ParticleId, usize>>,
}

impl<'a> ParticleSelector<'a> {
    /// Bind criteria to per-particle measurement counts. Without counts
    /// every particle is treated as having no measurements.
    pub fn new(
        criteria: &'a ParticleCriteria,
        counts: Option<&'a HashMap<ParticleId, usize>>,
    ) -> Self {
        Self { criteria, counts }
    }
}

impl Criteria<ParticleRecord> for ParticleSelector<'_> {
    fn accepts(&self, particle: &ParticleRecord) -> bool {
        let measurements = self
            .counts
            .and_then(|counts| counts.get(&particle.id))
            .copied()
            .unwrap_or(0);
        self.criteria.accepts(particle, measurements)
    }

    fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply;
    use tracklab_types::{Provenance, Vector3};

    fn particle(id: u32, pt: f64, pz: f64, charge: f64, provenance: Provenance) -> ParticleRecord {
        ParticleRecord {
            id: ParticleId::new(1, id),
            pdg: 211,
            charge,
            mass: 0.14,
            momentum: Vector3::new(pt, 0.0, pz),
            vertex: Vector3::new(0.0, 0.0, 10.0 * f64::from(id)),
            time: 0.0,
            provenance,
        }
    }

    #[test]
    fn test_empty_criteria_is_identity() {
        let particles = vec![
            particle(0, 0.1, 0.0, 1.0, Provenance::HardScatter),
            particle(1, 5.0, 50.0, 0.0, Provenance::PileUp),
        ];
        let criteria = ParticleCriteria::default();
        assert!(criteria.is_empty());
        let selector = ParticleSelector::new(&criteria, None);
        assert!(Criteria::is_empty(&selector));
        let selected = apply(&particles, &selector);
        assert_eq!(selected, particles);
    }

    #[test]
    fn test_kinematic_and_flag_criteria() {
        let particles = vec![
            particle(0, 0.5, 0.0, 1.0, Provenance::HardScatter),
            particle(1, 2.0, 0.0, -1.0, Provenance::HardScatter),
            particle(2, 2.0, 0.0, 0.0, Provenance::HardScatter),
            particle(3, 2.0, 0.0, 1.0, Provenance::PileUp),
            particle(4, 2.0, 200.0, 1.0, Provenance::HardScatter),
        ];
        let criteria = ParticleCriteria::default()
            .with_pt(Range::at_least(1.0))
            .with_eta(Range::new(-4.0, 4.0))
            .without_neutral()
            .without_pile_up();
        let selected = apply(&particles, &ParticleSelector::new(&criteria, None));
        let ids: Vec<u32> = selected.iter().map(|p| p.id.particle).collect();
        assert_eq!(ids, vec![1]);

        let positive = ParticleCriteria::default().with_charge(ChargeSign::Positive);
        let selected = apply(&particles, &ParticleSelector::new(&positive, None));
        assert!(selected.iter().all(|p| p.charge > 0.0));
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn test_vertex_position_criteria() {
        let particles: Vec<_> = (0..5)
            .map(|i| particle(i, 1.0, 0.0, 1.0, Provenance::HardScatter))
            .collect();
        let criteria =
            ParticleCriteria::default().with_vertex(Range::UNBOUNDED, Range::below(25.0));
        let selected = apply(&particles, &ParticleSelector::new(&criteria, None));
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn test_measurement_count_criterion() {
        let particles: Vec<_> = (0..3)
            .map(|i| particle(i, 1.0, 0.0, 1.0, Provenance::HardScatter))
            .collect();
        let counts = HashMap::from([(ParticleId::new(1, 0), 9), (ParticleId::new(1, 1), 8)]);
        let criteria = ParticleCriteria::default().with_min_measurements(9);
        assert!(criteria.uses_measurements());
        let selected = apply(&particles, &ParticleSelector::new(&criteria, Some(&counts)));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, ParticleId::new(1, 0));
    }

    #[test]
    fn test_deserialize_partial_criteria() {
        let criteria: ParticleCriteria = toml::from_str(
            r#"
            pt = { min = 1.0 }
            eta = { min = -4.0, max = 4.0 }
            measurements = { min = 9 }
            remove_neutral = true
            "#,
        )
        .unwrap();
        assert_eq!(criteria.pt, Range::at_least(1.0));
        assert_eq!(criteria.measurements, CountRange::at_least(9));
        assert!(criteria.remove_neutral);
        assert!(criteria.abs_z.is_unbounded());
    }
}
