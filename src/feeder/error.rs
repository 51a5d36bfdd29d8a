use crate::writer::StoreError;

use super::transform::TransformError;

/// Errors that can occur while feeding records into a sink
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The sink rejected a record
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A transform failed; records before `index` were forwarded, none after
    #[error("Transform failed on record {index}: {source}")]
    Transform {
        /// Input position of the failing record
        index: u64,
        /// Error returned by the transform
        #[source]
        source: TransformError,
    },

    /// A transform panicked inside a worker thread
    #[error("Worker panicked while transforming record {index}")]
    WorkerPanicked {
        /// Input position of the record being transformed
        index: u64,
    },

    /// A worker thread could not be spawned
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(std::io::Error),

    /// All workers exited while records were still in flight
    #[error("Worker pool disconnected with records in flight")]
    Disconnected,
}
