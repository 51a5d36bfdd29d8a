use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::schema::{
    image_label_fields, FieldSpec, StoreManifest, DEFAULT_BUFFER_THRESHOLD, DEFAULT_IMAGE_KEY,
    DEFAULT_LABEL_KEY,
};

use super::error::StoreError;

/// Configuration for an array store writer.
///
/// Everything is fixed at construction; there is no runtime reconfiguration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path of the backing file
    pub path: PathBuf,

    /// Total number of records the store is preallocated to hold
    pub capacity: u64,

    /// Field declarations, in on-disk order
    pub fields: Vec<FieldSpec>,

    /// Number of buffered records that triggers an automatic flush
    pub buffer_threshold: usize,
}

impl StoreConfig {
    /// Create a configuration with the default threshold.
    pub fn new<P: AsRef<Path>>(path: P, capacity: u64, fields: Vec<FieldSpec>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            capacity,
            fields,
            buffer_threshold: DEFAULT_BUFFER_THRESHOLD,
        }
    }

    /// Configuration with the default `images` (f32) and `labels` (u8) fields.
    pub fn images_and_labels<P: AsRef<Path>>(
        path: P,
        capacity: u64,
        image_shape: [usize; 3],
    ) -> Self {
        Self::new(
            path,
            capacity,
            image_label_fields(DEFAULT_IMAGE_KEY, DEFAULT_LABEL_KEY, image_shape),
        )
    }

    /// Set the flush threshold
    pub fn with_buffer_threshold(mut self, threshold: usize) -> Self {
        self.buffer_threshold = threshold;
        self
    }

    /// Look up a field declaration by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate the configuration before any file is touched
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.fields.is_empty() {
            return Err(StoreError::InvalidConfig(
                "at least one field is required".to_string(),
            ));
        }
        if self.buffer_threshold == 0 {
            return Err(StoreError::InvalidConfig(
                "buffer threshold must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(StoreError::InvalidConfig(
                    "field names must not be empty".to_string(),
                ));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(StoreError::InvalidConfig(format!(
                    "duplicate field '{}'",
                    field.name
                )));
            }
            if field.record_shape.contains(&0) {
                return Err(StoreError::InvalidConfig(format!(
                    "field '{}' has a zero-sized dimension",
                    field.name
                )));
            }
            let region = field
                .checked_record_bytes()
                .and_then(|bytes| self.capacity.checked_mul(bytes));
            if region.is_none() {
                return Err(StoreError::InvalidConfig(format!(
                    "field '{}' region size overflows",
                    field.name
                )));
            }
        }
        if StoreManifest::required_len(&self.fields, self.capacity).is_none() {
            return Err(StoreError::InvalidConfig(format!(
                "{} records of the declared fields overflow the file size",
                self.capacity
            )));
        }
        Ok(())
    }
}
