//! Detector description for the tracklab chain.
//!
//! Geometry and field are consumed by the pipeline only through the
//! [`TrackingGeometry`] and [`MagneticField`] traits. Both are immutable
//! once built and shared read-only by every event worker.
//!
//! # Architecture
//!
//! ```text
//! DetectorConfig (TOML / generic())
//!        │
//!        ▼
//! DetectorGeometry ──► Layer ──► Surface (module, local frame)
//!        │
//!        └─ next_crossing(&Helix) ◄── Helix (field-dependent trajectory)
//! ```
//!
//! The same [`Helix`] propagation drives both fast simulation and track
//! finding.

mod config;
mod error;
mod field;
mod geometry;
mod helix;

pub use config::{DetectorConfig, LayerConfig, LayerShape};
pub use error::ResourceError;
pub use field::{ConstantField, MagneticField, RzFieldMap};
pub use geometry::{Crossing, DetectorGeometry, Layer, Surface, SurfaceBounds, TrackingGeometry};
pub use helix::{Helix, MIN_STEP};
