use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use log::{debug, info, trace, warn};

use crate::schema::StoreManifest;

use super::buffer::AccumulationBuffer;
use super::config::StoreConfig;
use super::error::StoreError;
use super::sink::RecordSink;
use super::stats::StoreStats;
use super::types::Record;

/// Resources held while a store is open.
struct OpenStore {
    file: File,
    manifest: StoreManifest,
    buffer: AccumulationBuffer,
}

/// Buffered, capacity-bounded writer for an on-disk array store.
///
/// A writer starts out closed. [`open`](Self::open) creates the backing file
/// and preallocates every field region for `capacity` records.
/// [`add`](Self::add) stages records in memory and commits them in contiguous
/// batches once `buffer_threshold` records are pending.
/// [`close`](Self::close) commits whatever is left and finalizes the header.
///
/// ```text
/// Closed --open()--> Open --add()*, flush()*--> Open --close()--> Closed
/// ```
///
/// # Ownership
///
/// A writer is single-owner and single-threaded. Exclusivity is enforced
/// per instance by the open state, not by OS-level file locks.
///
/// # Drop Safety
///
/// Dropping an open writer closes it. Errors from that implicit close can
/// only be logged; call [`close`](Self::close) or use
/// [`with_session`](Self::with_session) to observe them.
///
/// # Example
///
/// ```rust,no_run
/// use samplestore::writer::{ArrayStoreWriter, Record, StoreConfig};
///
/// let config = StoreConfig::images_and_labels("files.samples", 10, [2, 2, 1])
///     .with_buffer_threshold(4);
/// let mut writer = ArrayStoreWriter::create(config)?;
/// for label in 0..10u8 {
///     let record = Record::new()
///         .with("images", vec![label as f32; 4])
///         .with("labels", label);
///     writer.add(&record)?;
/// }
/// let stats = writer.close()?;
/// assert_eq!(stats.records_written, 10);
/// # Ok::<(), samplestore::writer::StoreError>(())
/// ```
pub struct ArrayStoreWriter {
    config: StoreConfig,
    state: Option<OpenStore>,
    cursor: u64,
    stats: StoreStats,
}

impl ArrayStoreWriter {
    /// Create a closed writer for `config`. No file is touched.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            state: None,
            cursor: 0,
            stats: StoreStats::default(),
        }
    }

    /// Create a writer and open it.
    pub fn create(config: StoreConfig) -> Result<Self, StoreError> {
        let mut writer = Self::new(config);
        writer.open()?;
        Ok(writer)
    }

    /// Run `f` against a freshly opened store and close it on every exit path.
    ///
    /// The store is closed after `f` returns, whether it succeeded or not, so
    /// records committed before a failure stay on disk with a finalized
    /// header. If both `f` and the close fail, the error from `f` is returned
    /// and the close error is logged.
    pub fn with_session<T, E, F>(config: StoreConfig, f: F) -> Result<(T, StoreStats), E>
    where
        F: FnOnce(&mut ArrayStoreWriter) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut writer = Self::create(config)?;
        let outcome = f(&mut writer);
        let closed = writer.close();

        match (outcome, closed) {
            (Ok(value), Ok(stats)) => Ok((value, stats)),
            (Ok(_), Err(close_err)) => Err(close_err.into()),
            (Err(err), Ok(_)) => Err(err),
            (Err(err), Err(close_err)) => {
                warn!(
                    "Failed to close store {} after an error: {}",
                    writer.path().display(),
                    close_err
                );
                Err(err)
            }
        }
    }

    /// Create the backing file and preallocate all field regions.
    ///
    /// # Errors
    ///
    /// - [`StoreError::AlreadyOpen`] if this instance is already open; the
    ///   current session is left untouched.
    /// - [`StoreError::InvalidConfig`] if the configuration is unusable.
    /// - [`StoreError::IoError`] if the file cannot be created or sized.
    pub fn open(&mut self) -> Result<(), StoreError> {
        if self.state.is_some() {
            return Err(StoreError::AlreadyOpen(self.config.path.clone()));
        }
        self.config.validate()?;

        let manifest = StoreManifest::new(&self.config.fields, self.config.capacity)?;
        let header = manifest.encode_header()?;

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.config.path)?;
        // Unwritten slots read back as zero
        file.set_len(manifest.file_len())?;
        file.write_all(&header)?;

        info!(
            "Opened store {} (capacity {}, {} fields, {} bytes)",
            self.config.path.display(),
            self.config.capacity,
            manifest.fields.len(),
            manifest.file_len()
        );

        self.state = Some(OpenStore {
            file,
            manifest,
            buffer: AccumulationBuffer::new(&self.config.fields, self.config.buffer_threshold),
        });
        self.cursor = 0;
        self.stats = StoreStats::default();
        Ok(())
    }

    /// Stage one record; flushes synchronously once the buffer reaches the
    /// threshold.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotOpen`] if the store is closed.
    /// - [`StoreError::InvalidRecord`] if the record does not match the
    ///   fields; nothing is staged.
    /// - [`StoreError::CapacityExceeded`] if the store has no free slot for
    ///   this record. Records staged before it are committed first; the
    ///   rejected record is not.
    /// - [`StoreError::IoError`] from a triggered flush.
    pub fn add(&mut self, record: &Record) -> Result<(), StoreError> {
        let capacity = self.config.capacity;
        let pending = {
            let state = self.state.as_ref().ok_or(StoreError::NotOpen)?;
            AccumulationBuffer::validate(&self.config.fields, record)?;
            state.buffer.pending() as u64
        };

        if self.cursor + pending >= capacity {
            self.flush()?;
            return Err(StoreError::CapacityExceeded {
                cursor: self.cursor,
                pending: 1,
                capacity,
            });
        }

        let full = match self.state.as_mut() {
            Some(state) => {
                state.buffer.append(&self.config.fields, record);
                state.buffer.is_full()
            }
            None => return Err(StoreError::NotOpen),
        };
        trace!(
            "Buffered record {} ({} pending)",
            self.cursor + pending,
            pending + 1
        );

        if full {
            self.flush()?;
        }
        Ok(())
    }

    /// Commit all pending records as one contiguous range
    /// `[cursor, cursor + pending)` in every field.
    ///
    /// A no-op when nothing is pending.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotOpen`] if the store is closed.
    /// - [`StoreError::CapacityExceeded`] if the range would pass `capacity`;
    ///   nothing is written and the buffer is kept.
    /// - [`StoreError::IoError`] if a write fails.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        let capacity = self.config.capacity;
        let cursor = self.cursor;
        let state = self.state.as_mut().ok_or(StoreError::NotOpen)?;

        let pending = state.buffer.pending();
        if pending == 0 {
            return Ok(());
        }

        let end = cursor + pending as u64;
        if end > capacity {
            return Err(StoreError::CapacityExceeded {
                cursor,
                pending: pending as u64,
                capacity,
            });
        }

        let mut bytes_written = 0u64;
        for (layout, column) in state.manifest.fields.iter().zip(state.buffer.columns()) {
            let bytes = column.to_le_bytes();
            state
                .file
                .seek(SeekFrom::Start(layout.record_offset(cursor)))?;
            state.file.write_all(&bytes)?;
            bytes_written += bytes.len() as u64;
        }
        state.buffer.clear();

        debug!("Flushed {} records to slots [{}, {})", pending, cursor, end);

        self.cursor = end;
        self.stats.records_written = end;
        self.stats.flushes += 1;
        self.stats.largest_flush = self.stats.largest_flush.max(pending);
        self.stats.bytes_written += bytes_written;
        Ok(())
    }

    /// Commit residual records, finalize the header and release the file.
    ///
    /// Calling `close` on a closed writer is a no-op that returns the stats
    /// of the last session. The file handle is released even if the final
    /// flush fails; in that case the header is left marked incomplete.
    pub fn close(&mut self) -> Result<StoreStats, StoreError> {
        if self.state.is_none() {
            return Ok(self.stats.clone());
        }

        let flushed = self.flush();
        let mut state = match self.state.take() {
            Some(state) => state,
            None => return Ok(self.stats.clone()),
        };
        let finalized = flushed.and_then(|()| Self::finalize(&mut state, self.cursor));
        drop(state);
        finalized?;

        info!("Closed store {}: {}", self.config.path.display(), self.stats);
        Ok(self.stats.clone())
    }

    fn finalize(state: &mut OpenStore, cursor: u64) -> Result<(), StoreError> {
        state.manifest.records_written = cursor;
        state.manifest.complete = true;
        let header = state.manifest.encode_header()?;
        state.file.seek(SeekFrom::Start(0))?;
        state.file.write_all(&header)?;
        state.file.flush()?;
        Ok(())
    }

    /// Next unwritten slot
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Preallocated number of records
    pub fn capacity(&self) -> u64 {
        self.config.capacity
    }

    /// Records staged but not yet committed
    pub fn pending(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.buffer.pending())
    }

    /// Whether the store is currently open
    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Writer configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Manifest of the open session
    pub fn manifest(&self) -> Option<&StoreManifest> {
        self.state.as_ref().map(|s| &s.manifest)
    }

    /// Statistics of the current (or last) session
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }
}

impl RecordSink<Record> for ArrayStoreWriter {
    fn add(&mut self, item: Record) -> Result<(), StoreError> {
        ArrayStoreWriter::add(self, &item)
    }
}

impl Drop for ArrayStoreWriter {
    fn drop(&mut self) {
        if self.state.is_some() {
            debug!(
                "ArrayStoreWriter for {} dropped while open, closing",
                self.config.path.display()
            );
            if let Err(e) = self.close() {
                warn!(
                    "Failed to close store {} on drop: {}",
                    self.config.path.display(),
                    e
                );
            }
        }
    }
}
