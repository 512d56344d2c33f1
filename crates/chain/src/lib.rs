//! Full reconstruction chain.
//!
//! A [`RunConfig`] (usually read from TOML) describes the detector, the
//! field and every stage. [`build_sequencer`] turns it into a validated
//! [`Sequencer`](tracklab_sequencer::Sequencer):
//!
//! ```text
//! generation ─► [selection] ─► fatras ─► digitization ─► [selection]
//!            ─► seeding ─► tracking ─► [track selection] ─► writers
//! ```
//!
//! All configuration errors, including missing lookup tables, surface
//! from [`build_sequencer`] before any event is processed.

mod config;
mod error;
mod pipeline;

pub use config::{DetectorSource, DigitizationConfig, FieldConfig, OutputConfig, RunConfig};
pub use error::ChainError;
pub use pipeline::{build_sequencer, build_stages, load_resources, run};
