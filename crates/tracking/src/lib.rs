//! Track finding for tracklab.
//!
//! ```text
//!   seeds ──► helix fit ──► extrapolate to next layer ──► compatible? ──┐
//!                 ▲                                          │ yes    │ no
//!                 └──────────── branch per measurement ◄─────┘        ▼
//!                                                              missed layer
//!   best branch per seed ──► ambiguity resolution ──► tracks
//! ```
//!
//! The fit is a circle in the transverse plane and a line in arc length
//! versus z. Extrapolation uses the detector's [`Helix`] propagation in
//! the field at the branch's current position.
//!
//! [`Helix`]: tracklab_detector::Helix

mod ambiguity;
mod config;
mod finder;
mod fit;
mod stage;

pub use ambiguity::resolve_ambiguities;
pub use config::TrackFindingConfig;
pub use finder::find_tracks;
pub use fit::{fit_helix, FitPoint, HelixFit};
pub use stage::TrackFindingStage;
