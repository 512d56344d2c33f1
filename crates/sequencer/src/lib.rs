//! Event loop for tracklab.
//!
//! [`Sequencer::build`] checks that the stages form a valid chain (every
//! collection read was written by an earlier stage) and initializes them;
//! nothing runs until that succeeds. [`Sequencer::run`] then processes
//! events sequentially or on a rayon pool:
//!
//! - Every event gets its own context and random stream
//! - A failing stage aborts only its event
//! - Successful events go to each [`EventWriter`], one event at a time
//!
//! The returned [`RunSummary`] carries counts, failures, collection totals
//! and latency percentiles.

mod error;
mod sequencer;
mod summary;
mod writer;

pub use error::{OutputError, PipelineError};
pub use sequencer::{Sequencer, StopHandle};
pub use summary::{FailedEvent, LatencySummary, RunSummary};
pub use writer::{CollectedEvents, CollectingWriter, EventRecord, EventWriter, JsonEventWriter};
