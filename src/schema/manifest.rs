//! Store manifest and on-disk layout.
//!
//! Every store file starts with a fixed-size header region holding the magic
//! bytes, the manifest length and the manifest itself as JSON. The field
//! regions follow, one contiguous region per field (field-major layout):
//!
//! ```text
//! 0      SMPSTORE          magic (8 bytes)
//! 8      u64 LE            manifest length
//! 16     {...}             manifest JSON, zero padded
//! 4096   field 0 region    capacity × record_bytes, 64-byte aligned
//! ...    field k region
//! ```

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::constants::{
    FIELD_ALIGNMENT, HEADER_SIZE, MANIFEST_OFFSET, STORE_FORMAT_VERSION, STORE_MAGIC,
};
use super::dtype::DType;
use super::field::FieldSpec;

/// Errors raised while encoding or decoding the store header
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// The file does not start with the store magic bytes
    #[error("Not a samplestore file (bad magic bytes)")]
    BadMagic,

    /// The header region is shorter than the manifest it declares
    #[error("Header truncated: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required to decode the header
        needed: usize,
        /// Bytes actually available
        available: usize,
    },

    /// The manifest does not fit in the reserved header region
    #[error("Manifest is {len} bytes, header region allows at most {max}")]
    TooLarge {
        /// Encoded manifest length
        len: usize,
        /// Maximum manifest length
        max: usize,
    },

    /// The manifest describes an impossible layout
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    /// Error serializing/deserializing JSON
    #[error("JSON serialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

/// Placement of one field inside the store file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLayout {
    /// Field name
    pub name: String,
    /// Element type
    pub dtype: DType,
    /// Shape of one record
    pub record_shape: Vec<usize>,
    /// Absolute byte offset of the field region
    pub offset: u64,
    /// Bytes per record
    pub record_bytes: u64,
}

impl FieldLayout {
    /// Field declaration this layout was derived from.
    pub fn spec(&self) -> FieldSpec {
        FieldSpec::new(self.name.clone(), self.dtype, self.record_shape.clone())
    }

    /// Number of elements in one record.
    pub fn elements_per_record(&self) -> usize {
        self.record_shape.iter().product()
    }

    /// Absolute byte offset of record `index`.
    #[inline]
    pub fn record_offset(&self, index: u64) -> u64 {
        self.offset + index * self.record_bytes
    }
}

/// Manifest stored in the header of every store file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreManifest {
    /// Format version (e.g., "1.0.0")
    pub format_version: String,
    /// Unique identifier of this store instance
    pub store_id: Uuid,
    /// RFC 3339 timestamp of when the store was opened
    pub created: String,
    /// Name and version of the writer that created the file
    pub writer: String,
    /// Number of records the store was preallocated for
    pub capacity: u64,
    /// Number of records committed (the final cursor once complete)
    pub records_written: u64,
    /// Whether the store was closed cleanly
    pub complete: bool,
    /// Field regions, in declaration order
    pub fields: Vec<FieldLayout>,
}

fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

impl StoreManifest {
    /// Computes the layout for `fields` with room for `capacity` records.
    ///
    /// Fails with [`ManifestError::InvalidLayout`] if any region offset or
    /// the total file length would overflow.
    pub fn new(fields: &[FieldSpec], capacity: u64) -> Result<Self, ManifestError> {
        let (offsets, _) = Self::plan_regions(fields, capacity).ok_or_else(|| {
            ManifestError::InvalidLayout(format!(
                "{} records of the declared fields overflow the file size",
                capacity
            ))
        })?;
        let fields = fields
            .iter()
            .zip(offsets)
            .map(|(spec, offset)| FieldLayout {
                name: spec.name.clone(),
                dtype: spec.dtype,
                record_shape: spec.record_shape.clone(),
                offset,
                record_bytes: spec.record_bytes(),
            })
            .collect();

        Ok(Self {
            format_version: STORE_FORMAT_VERSION.to_string(),
            store_id: Uuid::new_v4(),
            created: chrono::Utc::now().to_rfc3339(),
            writer: format!("samplestore v{}", env!("CARGO_PKG_VERSION")),
            capacity,
            records_written: 0,
            complete: false,
            fields,
        })
    }

    /// File length needed to hold `capacity` records of `fields`, or `None`
    /// if the layout does not fit in a `u64`.
    pub fn required_len(fields: &[FieldSpec], capacity: u64) -> Option<u64> {
        Self::plan_regions(fields, capacity).map(|(_, end)| end)
    }

    /// Region offsets and the aligned end of the last region.
    fn plan_regions(fields: &[FieldSpec], capacity: u64) -> Option<(Vec<u64>, u64)> {
        let mut offset = HEADER_SIZE;
        let mut offsets = Vec::with_capacity(fields.len());
        for spec in fields {
            offsets.push(offset);
            let end = spec
                .checked_record_bytes()
                .and_then(|bytes| capacity.checked_mul(bytes))
                .and_then(|len| offset.checked_add(len))
                .filter(|end| *end <= u64::MAX - FIELD_ALIGNMENT)?;
            offset = align_up(end, FIELD_ALIGNMENT);
        }
        Some((offsets, offset))
    }

    /// Total file length implied by the layout.
    pub fn file_len(&self) -> u64 {
        self.fields
            .iter()
            .map(|f| align_up(f.offset + self.capacity * f.record_bytes, FIELD_ALIGNMENT))
            .max()
            .unwrap_or(HEADER_SIZE)
    }

    /// Looks up a field layout by name.
    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Encodes the full header region (exactly [`HEADER_SIZE`] bytes).
    pub fn encode_header(&self) -> Result<Vec<u8>, ManifestError> {
        let json = serde_json::to_vec(self)?;
        let max = (HEADER_SIZE - MANIFEST_OFFSET) as usize;
        if json.len() > max {
            return Err(ManifestError::TooLarge {
                len: json.len(),
                max,
            });
        }

        let start = MANIFEST_OFFSET as usize;
        let mut header = vec![0u8; HEADER_SIZE as usize];
        header[..STORE_MAGIC.len()].copy_from_slice(STORE_MAGIC);
        LittleEndian::write_u64(&mut header[8..start], json.len() as u64);
        header[start..start + json.len()].copy_from_slice(&json);
        Ok(header)
    }

    /// Decodes and validates a header region.
    pub fn decode_header(bytes: &[u8]) -> Result<Self, ManifestError> {
        let start = MANIFEST_OFFSET as usize;
        if bytes.len() < start {
            return Err(ManifestError::Truncated {
                needed: start,
                available: bytes.len(),
            });
        }
        if &bytes[..STORE_MAGIC.len()] != STORE_MAGIC {
            return Err(ManifestError::BadMagic);
        }

        let len = LittleEndian::read_u64(&bytes[8..start]);
        let max = HEADER_SIZE - MANIFEST_OFFSET;
        if len > max {
            return Err(ManifestError::TooLarge {
                len: len as usize,
                max: max as usize,
            });
        }
        let end = start + len as usize;
        if bytes.len() < end {
            return Err(ManifestError::Truncated {
                needed: end,
                available: bytes.len(),
            });
        }

        let manifest: StoreManifest = serde_json::from_slice(&bytes[start..end])?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Checks that the layout is self-consistent, using checked arithmetic so
    /// that hostile headers cannot overflow.
    fn validate(&self) -> Result<(), ManifestError> {
        if self.fields.is_empty() {
            return Err(ManifestError::InvalidLayout("no fields declared".to_string()));
        }
        if self.records_written > self.capacity {
            return Err(ManifestError::InvalidLayout(format!(
                "records_written {} exceeds capacity {}",
                self.records_written, self.capacity
            )));
        }

        let mut region_end = HEADER_SIZE;
        for field in &self.fields {
            let elements = field
                .record_shape
                .iter()
                .try_fold(1usize, |acc, &d| acc.checked_mul(d))
                .ok_or_else(|| {
                    ManifestError::InvalidLayout(format!("field '{}' shape overflows", field.name))
                })?;
            let expected = (elements as u64).checked_mul(field.dtype.size() as u64);
            if expected != Some(field.record_bytes) {
                return Err(ManifestError::InvalidLayout(format!(
                    "field '{}' declares {} bytes per record, shape implies {:?}",
                    field.name, field.record_bytes, expected
                )));
            }
            if field.offset < region_end {
                return Err(ManifestError::InvalidLayout(format!(
                    "field '{}' region at {} overlaps previous data ending at {}",
                    field.name, field.offset, region_end
                )));
            }
            region_end = self
                .capacity
                .checked_mul(field.record_bytes)
                .and_then(|len| field.offset.checked_add(len))
                .filter(|end| *end <= u64::MAX - FIELD_ALIGNMENT)
                .ok_or_else(|| {
                    ManifestError::InvalidLayout(format!("field '{}' region overflows", field.name))
                })?;
        }
        Ok(())
    }
}
