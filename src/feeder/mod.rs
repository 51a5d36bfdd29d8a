//! # Transform Feeder Module
//!
//! Pulls raw records from a source, runs each through a [`Transform`] and
//! pushes the results into a [`RecordSink`] (normally an
//! [`ArrayStoreWriter`](crate::writer::ArrayStoreWriter)).
//!
//! Two paths are provided:
//!
//! - [`Feeder::run_sequential`]: one record at a time on the calling thread.
//!   Baseline for timing and correctness comparison.
//! - [`Feeder::run_parallel`]: transforms run on `worker_count` threads;
//!   results are forwarded in **input order**, whatever order the workers
//!   finish in. The sink has no notion of record identity beyond append
//!   order, so this ordering is what keeps sample `i` and label `i` together.
//!
//! ## Failure Policy
//!
//! The first failing record (by input position) stops the run. Every record
//! before it has been forwarded and stays committed; nothing at or after it
//! is forwarded. There is no rollback.
//!
//! ## Example
//!
//! ```rust
//! use samplestore::feeder::{Feeder, FeederConfig, TransformError};
//!
//! let square = |x: u64| -> Result<u64, TransformError> { Ok(x * x) };
//! let mut out: Vec<u64> = Vec::new();
//!
//! let feeder = Feeder::new(FeederConfig::with_workers(4));
//! let stats = feeder.run_parallel(0..100u64, &square, &mut out)?;
//!
//! assert_eq!(stats.records_forwarded, 100);
//! assert_eq!(out[9], 81);
//! # Ok::<(), samplestore::feeder::FeedError>(())
//! ```

mod cancel;
mod config;
mod error;
mod parallel;
mod sequential;
mod stats;
mod transform;


pub use cancel::CancellationToken;
pub use config::FeederConfig;
pub use error::FeedError;
pub use stats::FeedStats;
pub use transform::{Transform, TransformError};

use crate::writer::RecordSink;

/// Drives a sink from a transform, sequentially or on a worker pool.
#[derive(Debug, Clone, Default)]
pub struct Feeder {
    config: FeederConfig,
    cancel: Option<CancellationToken>,
}

impl Feeder {
    /// Create a feeder with the given configuration
    pub fn new(config: FeederConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// Attach a cancellation token checked before each dispatch
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Feeder configuration
    pub fn config(&self) -> &FeederConfig {
        &self.config
    }

    /// Transform and forward `records` one at a time, in order, on the
    /// calling thread.
    pub fn run_sequential<R, I, T, S>(
        &self,
        records: R,
        transform: &T,
        sink: &mut S,
    ) -> Result<FeedStats, FeedError>
    where
        R: IntoIterator<Item = I>,
        T: Transform<I>,
        S: RecordSink<T::Output>,
    {
        sequential::feed_sequential(records, transform, sink, self.cancel.as_ref())
    }

    /// Transform `records` on `worker_count` threads and forward the results
    /// in input order.
    ///
    /// At most `worker_count × in_flight_per_worker` records are dispatched
    /// but not yet forwarded at any time.
    pub fn run_parallel<R, I, T, S>(
        &self,
        records: R,
        transform: &T,
        sink: &mut S,
    ) -> Result<FeedStats, FeedError>
    where
        R: IntoIterator<Item = I>,
        I: Send,
        T: Transform<I>,
        S: RecordSink<T::Output>,
    {
        parallel::feed_parallel(records, transform, sink, &self.config, self.cancel.as_ref())
    }
}
