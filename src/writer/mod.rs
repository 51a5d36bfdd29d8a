//! # Array Store Writer Module
//!
//! This module provides the buffered, capacity-bounded writer that owns the
//! on-disk array layout, the append/flush protocol and the store lifecycle.
//!
//! ## Design Principles
//!
//! 1. **Fixed Capacity**: Every field region is preallocated for `capacity`
//!    records when the store is opened. Nothing ever grows, wraps or
//!    truncates; running out of slots is an error.
//!
//! 2. **Buffered Accumulation**: Records are staged in memory and committed
//!    in contiguous batches, amortizing per-write I/O into large block writes.
//!
//! 3. **Field Alignment**: A flush writes the same slot range to every field,
//!    so record `i` of each field always shares index `i`.
//!
//! 4. **Scoped Lifecycle**: `close()` runs on every exit path
//!    ([`ArrayStoreWriter::with_session`] or `Drop`), so residual buffered
//!    records are never lost.

mod buffer;
mod config;
mod error;
mod sink;
mod stats;
mod types;
mod writer_impl;

#[cfg(test)]
mod tests;

pub use config::StoreConfig;
pub use error::StoreError;
pub use sink::RecordSink;
pub use stats::StoreStats;
pub use types::{ColumnData, Record};
pub use writer_impl::ArrayStoreWriter;
