//! Particle and track selection for tracklab.
//!
//! Selection is a pure filter: the output is the subsequence of the input
//! that passes every configured criterion, in the original order. Unset
//! criteria do not constrain, so an empty criteria set is the identity.

mod particle;
mod range;
mod stage;
mod track;

pub use particle::{ChargeSign, ParticleCriteria, ParticleSelector};
pub use range::{CountRange, Range};
pub use stage::{ParticleSelectionStage, TrackSelectionStage};
pub use track::TrackCriteria;

/// A predicate over items of type `T`.
pub trait Criteria<T> {
    /// Whether `item` passes every criterion.
    fn accepts(&self, item: &T) -> bool;

    /// Whether the criteria accept everything.
    fn is_empty(&self) -> bool {
        false
    }
}

/// Keep the items accepted by `criteria`, preserving order.
pub fn apply<T: Clone, C: Criteria<T> + ?Sized>(items: &[T], criteria: &C) -> Vec<T> {
    if criteria.is_empty() {
        return items.to_vec();
    }
    items
        .iter()
        .filter(|item| criteria.accepts(item))
        .cloned()
        .collect()
}
