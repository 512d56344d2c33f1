//! Sequencer errors.

use std::path::PathBuf;
use thiserror::Error;
use tracklab_core::ConfigError;

/// An event writer failed.
///
/// Recorded against the event being written; the run continues.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The pipeline could not be built or run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("writer '{writer}' failed to finish: {source}")]
    Output {
        writer: String,
        #[source]
        source: OutputError,
    },
}
