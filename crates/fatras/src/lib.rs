//! Fast track simulation for tracklab.
//!
//! Charged particles are propagated as piecewise helices from one layer
//! crossing to the next. The field is re-evaluated at every crossing, and
//! material layers apply Highland multiple scattering and a constant
//! energy loss. A crossing inside a sensitive module records a
//! [`SimulatedHit`](tracklab_types::SimulatedHit).
//!
//! ```text
//! particle ──► Helix ──► next_crossing ──► hit? ──► material ──┐
//!                ▲                                            │
//!                └────────────── new position / direction ◄───┘
//! ```

mod config;
mod material;
mod simulation;
mod stage;

pub use config::FatrasConfig;
pub use material::{energy_loss, highland_theta0, scatter};
pub use simulation::propagate;
pub use stage::FatrasStage;
