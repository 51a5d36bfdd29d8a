use byteorder::{ByteOrder, LittleEndian};

use crate::schema::DType;

// ============================================================================
// Typed Column Data
// ============================================================================

/// A typed, flat run of elements for one field.
///
/// Used for the values of a single record, for the per-field staging columns
/// of the accumulation buffer, and for data read back from a store.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Unsigned 8-bit values
    U8(Vec<u8>),
    /// Unsigned 16-bit values
    U16(Vec<u16>),
    /// Signed 32-bit values
    I32(Vec<i32>),
    /// Signed 64-bit values
    I64(Vec<i64>),
    /// 32-bit float values
    F32(Vec<f32>),
    /// 64-bit float values
    F64(Vec<f64>),
}

impl ColumnData {
    /// Create an empty column of `dtype` with room for `capacity` elements.
    pub fn with_capacity(dtype: DType, capacity: usize) -> Self {
        match dtype {
            DType::U8 => ColumnData::U8(Vec::with_capacity(capacity)),
            DType::U16 => ColumnData::U16(Vec::with_capacity(capacity)),
            DType::I32 => ColumnData::I32(Vec::with_capacity(capacity)),
            DType::I64 => ColumnData::I64(Vec::with_capacity(capacity)),
            DType::F32 => ColumnData::F32(Vec::with_capacity(capacity)),
            DType::F64 => ColumnData::F64(Vec::with_capacity(capacity)),
        }
    }

    /// Element type of this column
    pub fn dtype(&self) -> DType {
        match self {
            ColumnData::U8(_) => DType::U8,
            ColumnData::U16(_) => DType::U16,
            ColumnData::I32(_) => DType::I32,
            ColumnData::I64(_) => DType::I64,
            ColumnData::F32(_) => DType::F32,
            ColumnData::F64(_) => DType::F64,
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            ColumnData::U8(v) => v.len(),
            ColumnData::U16(v) => v.len(),
            ColumnData::I32(v) => v.len(),
            ColumnData::I64(v) => v.len(),
            ColumnData::F32(v) => v.len(),
            ColumnData::F64(v) => v.len(),
        }
    }

    /// Returns true if the column holds no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all elements, keeping the allocation
    pub fn clear(&mut self) {
        match self {
            ColumnData::U8(v) => v.clear(),
            ColumnData::U16(v) => v.clear(),
            ColumnData::I32(v) => v.clear(),
            ColumnData::I64(v) => v.clear(),
            ColumnData::F32(v) => v.clear(),
            ColumnData::F64(v) => v.clear(),
        }
    }

    /// Append the elements of `other`. Returns `false` (and appends nothing)
    /// if the dtypes differ.
    pub fn extend_from(&mut self, other: &ColumnData) -> bool {
        match (self, other) {
            (ColumnData::U8(a), ColumnData::U8(b)) => a.extend_from_slice(b),
            (ColumnData::U16(a), ColumnData::U16(b)) => a.extend_from_slice(b),
            (ColumnData::I32(a), ColumnData::I32(b)) => a.extend_from_slice(b),
            (ColumnData::I64(a), ColumnData::I64(b)) => a.extend_from_slice(b),
            (ColumnData::F32(a), ColumnData::F32(b)) => a.extend_from_slice(b),
            (ColumnData::F64(a), ColumnData::F64(b)) => a.extend_from_slice(b),
            _ => return false,
        }
        true
    }

    /// Copy of the elements in `start..end`.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn slice(&self, start: usize, end: usize) -> ColumnData {
        match self {
            ColumnData::U8(v) => ColumnData::U8(v[start..end].to_vec()),
            ColumnData::U16(v) => ColumnData::U16(v[start..end].to_vec()),
            ColumnData::I32(v) => ColumnData::I32(v[start..end].to_vec()),
            ColumnData::I64(v) => ColumnData::I64(v[start..end].to_vec()),
            ColumnData::F32(v) => ColumnData::F32(v[start..end].to_vec()),
            ColumnData::F64(v) => ColumnData::F64(v[start..end].to_vec()),
        }
    }

    /// Encode all elements as little-endian bytes
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.len() * self.dtype().size()];
        match self {
            ColumnData::U8(v) => out.copy_from_slice(v),
            ColumnData::U16(v) => LittleEndian::write_u16_into(v, &mut out),
            ColumnData::I32(v) => LittleEndian::write_i32_into(v, &mut out),
            ColumnData::I64(v) => LittleEndian::write_i64_into(v, &mut out),
            ColumnData::F32(v) => LittleEndian::write_f32_into(v, &mut out),
            ColumnData::F64(v) => LittleEndian::write_f64_into(v, &mut out),
        }
        out
    }

    /// Decode little-endian bytes. Trailing bytes that do not form a whole
    /// element are ignored.
    pub fn from_le_bytes(dtype: DType, bytes: &[u8]) -> Self {
        let count = bytes.len() / dtype.size();
        let bytes = &bytes[..count * dtype.size()];
        match dtype {
            DType::U8 => ColumnData::U8(bytes.to_vec()),
            DType::U16 => {
                let mut v = vec![0u16; count];
                LittleEndian::read_u16_into(bytes, &mut v);
                ColumnData::U16(v)
            }
            DType::I32 => {
                let mut v = vec![0i32; count];
                LittleEndian::read_i32_into(bytes, &mut v);
                ColumnData::I32(v)
            }
            DType::I64 => {
                let mut v = vec![0i64; count];
                LittleEndian::read_i64_into(bytes, &mut v);
                ColumnData::I64(v)
            }
            DType::F32 => {
                let mut v = vec![0f32; count];
                LittleEndian::read_f32_into(bytes, &mut v);
                ColumnData::F32(v)
            }
            DType::F64 => {
                let mut v = vec![0f64; count];
                LittleEndian::read_f64_into(bytes, &mut v);
                ColumnData::F64(v)
            }
        }
    }

    /// Borrow as `u8` values
    pub fn as_u8(&self) -> Option<&[u8]> {
        match self {
            ColumnData::U8(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow as `u16` values
    pub fn as_u16(&self) -> Option<&[u16]> {
        match self {
            ColumnData::U16(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow as `i32` values
    pub fn as_i32(&self) -> Option<&[i32]> {
        match self {
            ColumnData::I32(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow as `i64` values
    pub fn as_i64(&self) -> Option<&[i64]> {
        match self {
            ColumnData::I64(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow as `f32` values
    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            ColumnData::F32(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow as `f64` values
    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            ColumnData::F64(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! impl_column_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for ColumnData {
                fn from(values: Vec<$ty>) -> Self {
                    ColumnData::$variant(values)
                }
            }

            impl From<$ty> for ColumnData {
                fn from(value: $ty) -> Self {
                    ColumnData::$variant(vec![value])
                }
            }
        )*
    };
}

impl_column_from!(u8 => U8, u16 => U16, i32 => I32, i64 => I64, f32 => F32, f64 => F64);

// ============================================================================
// Records
// ============================================================================

/// One logical record: a mapping from field name to that field's values.
///
/// # Example
///
/// ```rust
/// use samplestore::writer::Record;
///
/// let record = Record::new()
///     .with("images", vec![0.0f32; 4])
///     .with("labels", 7u8);
/// assert_eq!(record.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: Vec<(String, ColumnData)>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ColumnData>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set the value of a field, replacing any previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ColumnData>) {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    /// Value of a field
    pub fn get(&self, name: &str) -> Option<&ColumnData> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Number of fields present
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no fields are present
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(name, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnData)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }
}
