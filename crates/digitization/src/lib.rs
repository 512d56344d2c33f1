//! Digitization for tracklab.
//!
//! Simulated hits are grouped by module, merged when closer than the
//! configured distance, and smeared per local coordinate. The smearing
//! model is chosen by the most specific configured region of the module:
//! (volume, layer, sensitive), then (volume, layer), then (volume).

mod config;
mod digitizer;
mod smearing;
mod stage;

pub use config::{RegionSmearing, SmearingConfig, SmearingMap};
pub use digitizer::{digitize, DigitizationError};
pub use smearing::SmearingModel;
pub use stage::DigitizationStage;
