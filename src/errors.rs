use crate::key::Key;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Segment-level errors.
#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("segment at {path:?} is full: {lines_stored}/{max_rows_per_segment} rows stored")]
    SegmentFull {
        path: PathBuf,
        lines_stored: u32,
        max_rows_per_segment: u32,
    },

    #[error(
        "requested range [{from}, {to}] is outside segment range [{smallest_key}, {largest_key}]"
    )]
    SegmentRangeExceeded {
        from: Key,
        to: Key,
        smallest_key: Key,
        largest_key: Key,
    },

    #[error("no record with key {key} in segment (range [{smallest_key}, {largest_key}])")]
    ItemNotFound {
        key: Key,
        smallest_key: Key,
        largest_key: Key,
    },

    #[error("I/O failure on segment file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode segment record")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("failed to decode segment record")]
    Decode(#[from] bincode::error::DecodeError),
}

/// Segment-set-level errors.
#[derive(Debug, Error)]
pub enum SegmentSetError {
    #[error("{0}")]
    Segment(#[from] SegmentError),

    #[error("no segment covers key {key} (set range [{smallest_key}, {largest_key}])")]
    SegmentRangeExceeded {
        key: Key,
        smallest_key: Key,
        largest_key: Key,
    },

    #[error("I/O failure on segment set directory {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Registry-level errors, including the codec/schema failures that arise at
/// the typed value-encoding boundary.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("table '{0}' already exists")]
    TableExists(String),

    #[error("table '{0}' not found")]
    TableNotFound(String),

    #[error(
        "schema mismatch for table '{table}': registered as {expected}, used as {actual}"
    )]
    SchemaMismatch {
        table: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("{0}")]
    SegmentSet(#[from] SegmentSetError),

    #[error("I/O failure at root {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode record for table '{table}'")]
    Encode {
        table: String,
        #[source]
        source: bincode::error::EncodeError,
    },

    #[error("failed to decode record for table '{table}'")]
    Decode {
        table: String,
        #[source]
        source: bincode::error::DecodeError,
    },
}
