//! Error types shared by the aggregation pipelines.

use std::io;
use thiserror::Error;

/// Errors that can occur while aggregating a track.
#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("invalid tile geometry: {0}")]
    InvalidGeometry(String),

    #[error("unknown chromosome: {0}")]
    UnknownChromosome(String),

    #[error("position {pos} out of range for {chrom} (length {size})")]
    CoordinateOutOfRange {
        chrom: String,
        pos: u64,
        size: u64,
    },

    #[error("malformed record at line {line}: {message}")]
    MalformedRecord { line: usize, message: String },

    #[error("unknown assembly '{0}' (pass --chromsizes-filename to supply sizes)")]
    UnknownAssembly(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, AggregateError>;
