//! Conversion error types.

use crate::session::Metric;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that terminate a conversion run.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The export is not valid JSON or lacks a required key.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// The export contains no samples to convert.
    #[error("Workout contains no samples")]
    EmptySeries,

    /// A series has too few points to build an interpolant.
    #[error("Series '{metric}' has {count} sample(s); at least 2 are required to interpolate")]
    InsufficientSamples { metric: Metric, count: usize },

    /// The input file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The output file could not be written.
    #[error("Failed to write {}: {source}", path.display())]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// XML generation error
    #[error("XML error: {0}")]
    Xml(String),
}

/// Result type for conversion operations.
pub type ConvertResult<T> = Result<T, ConvertError>;
