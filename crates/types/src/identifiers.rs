//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Event number within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventIndex(pub u64);

impl EventIndex {
    /// Get the next event index.
    pub fn next(self) -> Self {
        EventIndex(self.0 + 1)
    }
}

impl fmt::Display for EventIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Event({})", self.0)
    }
}

/// Particle barcode.
///
/// `vertex` numbers the interaction the particle was produced in (1 is the
/// hard scatter, higher numbers are pile-up interactions) and `particle`
/// numbers the particle within that interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticleId {
    pub vertex: u32,
    pub particle: u32,
}

impl ParticleId {
    pub fn new(vertex: u32, particle: u32) -> Self {
        Self { vertex, particle }
    }

    /// Pack into a single integer, preserving ordering.
    pub fn as_u64(&self) -> u64 {
        (u64::from(self.vertex) << 32) | u64::from(self.particle)
    }
}

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Particle({}:{})", self.vertex, self.particle)
    }
}

/// Detector region: a volume/layer pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId {
    pub volume: u32,
    pub layer: u32,
}

impl RegionId {
    pub fn new(volume: u32, layer: u32) -> Self {
        Self { volume, layer }
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vol={}|lay={}", self.volume, self.layer)
    }
}

/// Detector surface identity.
///
/// `sensitive` numbers the module within its layer starting at 1; 0 denotes
/// the layer itself rather than one of its modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeometryId {
    pub volume: u32,
    pub layer: u32,
    pub sensitive: u32,
}

impl GeometryId {
    pub fn new(volume: u32, layer: u32, sensitive: u32) -> Self {
        Self {
            volume,
            layer,
            sensitive,
        }
    }

    /// The region (volume and layer) this surface belongs to.
    pub fn region(&self) -> RegionId {
        RegionId::new(self.volume, self.layer)
    }
}

impl fmt::Display for GeometryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vol={}|lay={}|sen={}",
            self.volume, self.layer, self.sensitive
        )
    }
}

/// Position of a hit in the event's hit collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HitIndex(pub u32);

impl HitIndex {
    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

/// Position of a measurement in the event's measurement collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeasurementIndex(pub u32);

impl MeasurementIndex {
    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for MeasurementIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Measurement({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_particle_id_packing_keeps_order() {
        let a = ParticleId::new(1, 7);
        let b = ParticleId::new(2, 0);
        assert!(a < b);
        assert!(a.as_u64() < b.as_u64());
        assert_eq!(a.as_u64(), (1u64 << 32) | 7);
    }

    #[test]
    fn test_geometry_id_region() {
        let id = GeometryId::new(8, 4, 12);
        assert_eq!(id.region(), RegionId::new(8, 4));
        assert_eq!(id.to_string(), "vol=8|lay=4|sen=12");
    }

    #[test]
    fn test_event_index_serializes_transparently() {
        let json = serde_json::to_string(&EventIndex(42)).unwrap();
        assert_eq!(json, "42");
    }
}
