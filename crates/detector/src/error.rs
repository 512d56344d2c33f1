//! Error types for detector resources.

use std::path::PathBuf;
use thiserror::Error;

/// A geometry or field resource could not be loaded.
///
/// Resource errors are fatal: no event is processed without valid
/// geometry and field handles.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// Reading a resource file failed.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The detector description could not be parsed.
    #[error("failed to parse detector description: {0}")]
    GeometryParse(String),

    /// The detector description is inconsistent.
    #[error("invalid detector description: {0}")]
    InvalidGeometry(String),

    /// The field map is malformed.
    #[error("invalid field map (line {line}): {reason}")]
    FieldMap { line: usize, reason: String },
}
