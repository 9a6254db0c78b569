//! Track loading errors

use thiserror::Error;

/// Errors that can occur while loading track geometry
///
/// Any of these at startup is fatal: the track is a hard dependency and
/// the server must not start serving without one.
#[derive(Error, Debug)]
pub enum TrackError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Bad track sample at line {line}: {message}")]
    BadSample { line: usize, message: String },

    #[error("No valid track samples loaded")]
    NoSamples,
}
