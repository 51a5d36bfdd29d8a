use std::path::PathBuf;

use crate::schema::ManifestError;

/// Errors that can occur while writing a store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// `open()` was called on a store instance that is already open
    #[error("Store is already open: {0}")]
    AlreadyOpen(PathBuf),

    /// `add()` or `flush()` was called on a closed store
    #[error("Store is not open")]
    NotOpen,

    /// A flush would write past the preallocated capacity
    #[error("Capacity exceeded: cursor {cursor} + {pending} pending records > capacity {capacity}")]
    CapacityExceeded {
        /// Next unwritten slot
        cursor: u64,
        /// Records that were to be committed
        pending: u64,
        /// Preallocated capacity
        capacity: u64,
    },

    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error encoding the store header
    #[error("Manifest error: {0}")]
    ManifestError(#[from] ManifestError),

    /// Invalid store configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A record does not match the store's fields
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}
