//! Error types for pipeline configuration and event processing.

use crate::context::Collection;
use std::path::PathBuf;
use thiserror::Error;

/// The pipeline is misconfigured.
///
/// Configuration errors surface while the pipeline is being built and are
/// fatal to the run.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A kinematic or geometric range has `min > max`.
    #[error("{parameter}: inverted range [{min}, {max}]")]
    InvalidRange {
        parameter: String,
        min: f64,
        max: f64,
    },

    /// A scalar parameter is out of its allowed domain.
    #[error("{parameter}: {reason}")]
    InvalidParameter { parameter: String, reason: String },

    /// A variant tag does not name a known implementation.
    #[error("unknown {kind} '{tag}'")]
    UnknownVariant { kind: String, tag: String },

    /// The selected variant needs a table that was not supplied.
    #[error("{variant} requires the {table} table")]
    MissingTable {
        variant: &'static str,
        table: &'static str,
    },

    /// A lookup table is malformed.
    #[error("{table} table, line {line}: {reason}")]
    MalformedTable {
        table: &'static str,
        line: usize,
        reason: String,
    },

    /// A configuration file could not be parsed.
    #[error("failed to parse {what}: {reason}")]
    Parse { what: String, reason: String },

    /// A configuration or table file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stage reads a collection no earlier stage writes.
    #[error("stage '{stage}' reads {collection} but no earlier stage writes it")]
    MissingInput {
        stage: String,
        collection: Collection,
    },

    /// A sensitive surface has no smearing configuration.
    #[error("no smearing configuration for surface {surface}")]
    MissingSmearing { surface: String },

    /// The pipeline has no stages.
    #[error("pipeline has no stages")]
    EmptyPipeline,
}

impl ConfigError {
    /// Check that `min <= max`, reporting `parameter` otherwise.
    pub fn check_range(parameter: &str, min: f64, max: f64) -> Result<(), ConfigError> {
        if min <= max {
            Ok(())
        } else {
            Err(ConfigError::InvalidRange {
                parameter: parameter.to_string(),
                min,
                max,
            })
        }
    }

    pub fn invalid(parameter: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter {
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }

    /// Read a configuration file into a string.
    pub fn read_file(path: &std::path::Path) -> Result<String, ConfigError> {
        std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// A stage could not produce a result for one event.
///
/// The event is recorded as failed and the run continues.
#[derive(Debug, Error)]
pub enum StageError {
    /// The stage's algorithm failed on this event's data.
    #[error("{stage}: {reason}")]
    Processing { stage: String, reason: String },

    /// The event exposed a configuration gap not caught at build time.
    #[error("{stage}: {source}")]
    Configuration {
        stage: String,
        #[source]
        source: ConfigError,
    },
}

impl StageError {
    pub fn processing(stage: &str, reason: impl ToString) -> Self {
        StageError::Processing {
            stage: stage.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Name of the stage that failed.
    pub fn stage(&self) -> &str {
        match self {
            StageError::Processing { stage, .. } | StageError::Configuration { stage, .. } => stage,
        }
    }
}
