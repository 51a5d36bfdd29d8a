//! # Store Reader Module
//!
//! Read access to stores that were closed cleanly. Stores still being
//! written (or abandoned mid-write) are refused: partially written data has
//! no defined contents.
//!
//! ## Example
//!
//! ```rust,no_run
//! use samplestore::reader::ArrayStoreReader;
//!
//! let reader = ArrayStoreReader::open("files.samples")?;
//! println!("{} of {} slots used", reader.len(), reader.capacity());
//!
//! let labels = reader.read_field("labels")?;
//! if let Some(labels) = labels.as_u8() {
//!     println!("first label: {:?}", labels.first());
//! }
//! # Ok::<(), samplestore::reader::ReaderError>(())
//! ```

mod error;


pub use error::ReaderError;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::schema::{FieldLayout, StoreManifest, HEADER_SIZE};
use crate::writer::{ColumnData, Record};

/// Reader for completed store files
#[derive(Debug)]
pub struct ArrayStoreReader {
    path: PathBuf,
    file: File,
    manifest: StoreManifest,
}

impl ArrayStoreReader {
    /// Open a store and validate its header.
    ///
    /// # Errors
    ///
    /// - [`ReaderError::ManifestError`] if the header is missing or corrupt.
    /// - [`ReaderError::Incomplete`] if the store was not closed cleanly.
    /// - [`ReaderError::InvalidFormat`] if the file is shorter than its layout.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReaderError> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;

        let file_len = file.metadata()?.len();
        let header_len = file_len.min(HEADER_SIZE) as usize;
        let mut header = vec![0u8; header_len];
        file.read_exact(&mut header)?;

        let manifest = StoreManifest::decode_header(&header)?;
        if !manifest.complete {
            return Err(ReaderError::Incomplete(path));
        }
        if file_len < manifest.file_len() {
            return Err(ReaderError::InvalidFormat(format!(
                "{} is {} bytes, layout requires {}",
                path.display(),
                file_len,
                manifest.file_len()
            )));
        }

        Ok(Self {
            path,
            file,
            manifest,
        })
    }

    /// Path of the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store manifest
    pub fn manifest(&self) -> &StoreManifest {
        &self.manifest
    }

    /// Number of committed records
    pub fn len(&self) -> u64 {
        self.manifest.records_written
    }

    /// Returns true if no records were committed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Preallocated number of records
    pub fn capacity(&self) -> u64 {
        self.manifest.capacity
    }

    /// Layout of a field
    pub fn field(&self, name: &str) -> Result<&FieldLayout, ReaderError> {
        self.manifest
            .field(name)
            .ok_or_else(|| ReaderError::FieldNotFound(name.to_string()))
    }

    /// Values of all committed records of a field, record after record.
    pub fn read_field(&self, name: &str) -> Result<ColumnData, ReaderError> {
        let layout = self.field(name)?;
        self.read_range(layout, 0, self.len())
    }

    /// Values of the entire preallocated region of a field, including the
    /// zero-filled slots past the committed records.
    pub fn read_field_full(&self, name: &str) -> Result<ColumnData, ReaderError> {
        let layout = self.field(name)?;
        self.read_range(layout, 0, self.capacity())
    }

    /// All fields of one committed record.
    pub fn read_record(&self, index: u64) -> Result<Record, ReaderError> {
        if index >= self.len() {
            return Err(ReaderError::OutOfRange {
                index,
                len: self.len(),
            });
        }

        let mut record = Record::new();
        for layout in &self.manifest.fields {
            let values = self.read_range(layout, index, index + 1)?;
            record.insert(layout.name.clone(), values);
        }
        Ok(record)
    }

    fn read_range(
        &self,
        layout: &FieldLayout,
        start: u64,
        end: u64,
    ) -> Result<ColumnData, ReaderError> {
        let mut bytes = vec![0u8; ((end - start) * layout.record_bytes) as usize];
        let mut file = &self.file;
        file.seek(SeekFrom::Start(layout.record_offset(start)))?;
        file.read_exact(&mut bytes)?;
        Ok(ColumnData::from_le_bytes(layout.dtype, &bytes))
    }
}
