//! Truth particles.

use crate::identifiers::ParticleId;
use crate::kinematics::eta_from_components;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Which interaction of the bunch crossing produced a particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// The primary interaction of interest.
    HardScatter,
    /// An overlapping soft interaction.
    PileUp,
}

/// A generated truth particle.
///
/// Particles are created by the event source and only ever removed by
/// selection afterwards, never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleRecord {
    pub id: ParticleId,

    /// PDG Monte Carlo particle code.
    pub pdg: i32,

    /// Charge in units of e.
    pub charge: f64,

    /// Mass in GeV.
    pub mass: f64,

    /// Momentum at production in GeV.
    pub momentum: Vector3<f64>,

    /// Production vertex in mm.
    pub vertex: Vector3<f64>,

    /// Production time in ns.
    pub time: f64,

    pub provenance: Provenance,
}

impl ParticleRecord {
    /// Transverse momentum.
    pub fn pt(&self) -> f64 {
        self.momentum.xy().norm()
    }

    /// Absolute momentum.
    pub fn p(&self) -> f64 {
        self.momentum.norm()
    }

    pub fn energy(&self) -> f64 {
        (self.p().powi(2) + self.mass.powi(2)).sqrt()
    }

    pub fn eta(&self) -> f64 {
        eta_from_components(self.pt(), self.momentum.z)
    }

    pub fn phi(&self) -> f64 {
        self.momentum.y.atan2(self.momentum.x)
    }

    pub fn theta(&self) -> f64 {
        self.pt().atan2(self.momentum.z)
    }

    /// Transverse distance of the production vertex from the beam line.
    pub fn rho(&self) -> f64 {
        self.vertex.xy().norm()
    }

    pub fn abs_z(&self) -> f64 {
        self.vertex.z.abs()
    }

    pub fn is_charged(&self) -> bool {
        self.charge != 0.0
    }

    pub fn is_pile_up(&self) -> bool {
        self.provenance == Provenance::PileUp
    }
}
