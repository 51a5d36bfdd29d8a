use std::path::PathBuf;

use crate::schema::ManifestError;

/// Errors that can occur during reading
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Header could not be decoded
    #[error("Manifest error: {0}")]
    ManifestError(#[from] ManifestError),

    /// Invalid file format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// The store was never closed cleanly, so its contents are undefined
    #[error("Store was not closed cleanly: {0}")]
    Incomplete(PathBuf),

    /// Field not found
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    /// Record index outside the committed range
    #[error("Record {index} out of range (store holds {len} records)")]
    OutOfRange {
        /// Requested index
        index: u64,
        /// Committed record count
        len: u64,
    },
}
