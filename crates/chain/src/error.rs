//! Chain errors.

use thiserror::Error;
use tracklab_core::ConfigError;
use tracklab_detector::ResourceError;
use tracklab_sequencer::{OutputError, PipelineError};

/// The chain could not be assembled or run.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}
