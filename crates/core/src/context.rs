//! Per-event data threaded through the stages.

use crate::random::RandomStream;
use std::collections::HashMap;
use std::fmt;
use tracklab_types::{
    EventIndex, Measurement, ParticleId, ParticleRecord, Seed, SimulatedHit, SpacePoint,
    TrackCandidate,
};

/// Named event collections, used to declare stage inputs and outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    GeneratedParticles,
    Particles,
    Hits,
    Measurements,
    SpacePoints,
    Seeds,
    Tracks,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Collection::GeneratedParticles => "generated particles",
            Collection::Particles => "particles",
            Collection::Hits => "hits",
            Collection::Measurements => "measurements",
            Collection::SpacePoints => "space points",
            Collection::Seeds => "seeds",
            Collection::Tracks => "tracks",
        };
        f.write_str(name)
    }
}

/// Collections produced while processing one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventData {
    /// Everything the event source produced.
    pub generated_particles: Vec<ParticleRecord>,
    /// Particles surviving the most recent particle selection.
    pub particles: Vec<ParticleRecord>,
    pub hits: Vec<SimulatedHit>,
    pub measurements: Vec<Measurement>,
    pub space_points: Vec<SpacePoint>,
    pub seeds: Vec<Seed>,
    pub tracks: Vec<TrackCandidate>,
}

impl EventData {
    /// Number of measurements each particle contributed to.
    ///
    /// A merged measurement counts once for every distinct particle among
    /// its hits.
    pub fn measurements_per_particle(&self) -> HashMap<ParticleId, usize> {
        let mut counts = HashMap::new();
        for measurement in &self.measurements {
            let mut seen: Vec<ParticleId> = Vec::with_capacity(measurement.hits.len());
            for hit in &measurement.hits {
                if let Some(hit) = self.hits.get(hit.as_usize()) {
                    if !seen.contains(&hit.particle) {
                        seen.push(hit.particle);
                        *counts.entry(hit.particle).or_insert(0) += 1;
                    }
                }
            }
        }
        counts
    }

    /// Size of a collection.
    pub fn len_of(&self, collection: Collection) -> usize {
        match collection {
            Collection::GeneratedParticles => self.generated_particles.len(),
            Collection::Particles => self.particles.len(),
            Collection::Hits => self.hits.len(),
            Collection::Measurements => self.measurements.len(),
            Collection::SpacePoints => self.space_points.len(),
            Collection::Seeds => self.seeds.len(),
            Collection::Tracks => self.tracks.len(),
        }
    }
}

/// Everything a stage sees of one event.
///
/// Owned by the sequencer for the lifetime of the event and dropped after
/// output emission.
#[derive(Debug, Clone)]
pub struct EventContext {
    index: EventIndex,
    random: RandomStream,
    pub data: EventData,
}

impl EventContext {
    pub fn new(index: EventIndex, random: RandomStream) -> Self {
        Self {
            index,
            random,
            data: EventData::default(),
        }
    }

    pub fn index(&self) -> EventIndex {
        self.index
    }

    /// The event's private random substream.
    pub fn random(&self) -> &RandomStream {
        &self.random
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracklab_types::{GeometryId, HitIndex, Matrix2, MeasurementIndex, Vector2, Vector3};

    fn hit(particle: ParticleId) -> SimulatedHit {
        SimulatedHit {
            particle,
            surface: GeometryId::new(8, 2, 1),
            position: Vector3::new(32.0, 0.0, 0.0),
            direction: Vector3::x(),
            momentum: 1.0,
            index: 0,
        }
    }

    fn measurement(index: u32, hits: &[u32]) -> Measurement {
        Measurement {
            index: MeasurementIndex(index),
            surface: GeometryId::new(8, 2, 1),
            local: Vector2::zeros(),
            covariance: Matrix2::identity(),
            global: Vector3::new(32.0, 0.0, 0.0),
            hits: hits.iter().copied().map(HitIndex).collect(),
        }
    }

    #[test]
    fn test_measurements_per_particle_counts_distinct_particles() {
        let a = ParticleId::new(1, 0);
        let b = ParticleId::new(1, 1);
        let data = EventData {
            hits: vec![hit(a), hit(a), hit(b)],
            measurements: vec![
                measurement(0, &[0, 1]),
                measurement(1, &[2]),
                measurement(2, &[0, 2]),
            ],
            ..Default::default()
        };
        let counts = data.measurements_per_particle();
        assert_eq!(counts[&a], 2);
        assert_eq!(counts[&b], 2);
    }

    #[test]
    fn test_collection_display() {
        assert_eq!(Collection::SpacePoints.to_string(), "space points");
    }
}
