//! # samplestore - Buffered, Capacity-Bounded Sample Stores
//!
//! `samplestore` ingests a stream of (sample, label) pairs, runs each sample
//! through a processing function and persists the results into a
//! fixed-shape, preallocated on-disk array store.
//!
//! ## Key Features
//!
//! - **Preallocated Layout**: Every field (images, labels, ...) owns one
//!   contiguous region sized for the full capacity when the store is opened.
//!   Running out of slots is an error, never a silent truncation.
//!
//! - **Buffered Writes**: Records accumulate in memory and are committed in
//!   contiguous batches once the buffer threshold is reached, and once more on
//!   close.
//!
//! - **Ordered Parallel Feeding**: Transforms run on a pool of worker threads
//!   while results reach the store strictly in input order, so sample `i` and
//!   label `i` always land in slot `i`.
//!
//! - **Self-Describing Files**: A JSON manifest at the head of each file
//!   records the layout, the number of committed records and whether the
//!   store was closed cleanly.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use samplestore::augment::AugmentPipeline;
//! use samplestore::feeder::{Feeder, FeederConfig, TransformError};
//! use samplestore::sample::{RawSample, SampleSource, SyntheticDigits};
//! use samplestore::writer::{ArrayStoreWriter, Record, StoreConfig};
//!
//! let source = SyntheticDigits::new(1_000);
//! let pipeline = AugmentPipeline::default_pipeline(300, 300)?;
//!
//! let transform = |sample: RawSample| -> Result<Record, TransformError> {
//!     Ok(pipeline.process(sample)?.into_record("images", "labels"))
//! };
//!
//! let config = StoreConfig::images_and_labels("files.samples", source.len() as u64, [300, 300, 1]);
//! let (feed, store) = ArrayStoreWriter::with_session(config, |writer| {
//!     Feeder::new(FeederConfig::default()).run_parallel(source.samples(), &transform, writer)
//! })?;
//!
//! println!("{}", feed);
//! println!("{}", store);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - [`schema`]: element types, field declarations and the on-disk manifest
//! - [`writer`]: the buffered, capacity-bounded store writer
//! - [`reader`]: read access to completed stores
//! - [`feeder`]: sequential and order-preserving parallel transform feeding
//! - [`sample`]: sample types and the synthetic sample source
//! - [`augment`]: randomized image augmentation pipeline
//! - [`ingest`]: end-to-end orchestration of source, pipeline and stores
//!
//! ## File Layout
//!
//! ```text
//! 0      8        16                        4096
//! ┌──────┬────────┬─────────────────────────┬───────────────┬─────┬───────────────┐
//! │MAGIC │json len│ manifest JSON, 0-padded │ field 0 region│ pad │ field 1 region│ ...
//! └──────┴────────┴─────────────────────────┴───────────────┴─────┴───────────────┘
//! ```
//!
//! Each field region holds `capacity × record_bytes` little-endian values and
//! starts on a 64-byte boundary. Slots past the committed records read as
//! zero.

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod augment;
pub mod feeder;
pub mod ingest;
pub mod reader;
pub mod sample;
pub mod schema;
pub mod writer;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::augment::{AugmentError, AugmentPipeline, AugmentStep};
    pub use crate::feeder::{
        CancellationToken, FeedError, FeedStats, Feeder, FeederConfig, Transform, TransformError,
    };
    pub use crate::ingest::{run_ingest, IngestConfig, IngestError, IngestMode, IngestReport};
    pub use crate::reader::{ArrayStoreReader, ReaderError};
    pub use crate::sample::{ImageShape, ProcessedSample, RawSample, SampleSource, SyntheticDigits};
    pub use crate::schema::{DType, FieldSpec, StoreManifest, STORE_FORMAT_VERSION};
    pub use crate::writer::{
        ArrayStoreWriter, ColumnData, Record, RecordSink, StoreConfig, StoreError, StoreStats,
    };
}
