use serde::{Deserialize, Serialize};

use super::dtype::DType;

/// Declaration of one named field of a store.
///
/// A field holds `capacity` records, each of which is an array of
/// `record_shape` elements of type `dtype`. An empty `record_shape`
/// declares a scalar field (one element per record).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name (e.g. "images")
    pub name: String,
    /// Element type
    pub dtype: DType,
    /// Shape of a single record, without the leading capacity dimension
    pub record_shape: Vec<usize>,
}

impl FieldSpec {
    /// Create a field with an explicit record shape.
    pub fn new(name: impl Into<String>, dtype: DType, record_shape: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            dtype,
            record_shape,
        }
    }

    /// Create a scalar field (one element per record).
    pub fn scalar(name: impl Into<String>, dtype: DType) -> Self {
        Self::new(name, dtype, Vec::new())
    }

    /// Number of elements in one record.
    #[inline]
    pub fn elements_per_record(&self) -> usize {
        self.record_shape.iter().product()
    }

    /// Number of bytes occupied by one record.
    ///
    /// Unchecked; use [`FieldSpec::checked_record_bytes`] on untrusted shapes.
    #[inline]
    pub fn record_bytes(&self) -> u64 {
        (self.elements_per_record() * self.dtype.size()) as u64
    }

    /// Bytes per record, or `None` if the shape or byte count overflows.
    pub fn checked_record_bytes(&self) -> Option<u64> {
        let elements = self
            .record_shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))?;
        let bytes = elements.checked_mul(self.dtype.size())?;
        u64::try_from(bytes).ok()
    }

    /// Full shape of the backing array, `(capacity, *record_shape)`.
    pub fn array_shape(&self, capacity: u64) -> Vec<u64> {
        std::iter::once(capacity)
            .chain(self.record_shape.iter().map(|&d| d as u64))
            .collect()
    }
}
