//! Shared types for the tracklab reconstruction chain.
//!
//! Every collection that flows between pipeline stages is defined here:
//! truth particles, simulated hits, measurements, space points, seeds and
//! track candidates, together with the identifiers that link them.

mod hit;
mod identifiers;
pub mod kinematics;
mod measurement;
mod particle;
mod seed;
mod track;

pub use hit::SimulatedHit;
pub use identifiers::{EventIndex, GeometryId, HitIndex, MeasurementIndex, ParticleId, RegionId};
pub use measurement::Measurement;
pub use particle::{ParticleRecord, Provenance};
pub use seed::{Seed, SeedError, SpacePoint, MAX_SEED_SIZE, MIN_SEED_SIZE};
pub use track::{TrackCandidate, TrackParameters};

pub use nalgebra::{Matrix2, Vector2, Vector3};
