//! Core pipeline types for tracklab.
//!
//! A run is an ordered list of [`Stage`]s applied to every event. Each
//! event gets a fresh [`EventContext`] holding its collections and its
//! private [`RandomStream`]; geometry, field and the random-number factory
//! live in [`PipelineResources`] and are shared read-only.

mod context;
mod error;
pub mod random;
mod resources;
mod traits;

pub use context::{Collection, EventContext, EventData};
pub use error::{ConfigError, StageError};
pub use random::{RandomNumbers, RandomStream};
pub use resources::PipelineResources;
pub use traits::Stage;
