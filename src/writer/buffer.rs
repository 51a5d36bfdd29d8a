use crate::schema::FieldSpec;

use super::error::StoreError;
use super::types::{ColumnData, Record};

/// Upper bound on records reserved up front, so that large thresholds with
/// large records do not allocate the whole batch at open time.
const MAX_RESERVED_RECORDS: usize = 64;

/// Per-field staging columns for records not yet committed.
///
/// Columns are kept in field declaration order, so `columns()[k]` holds the
/// pending values of field `k`, record after record.
#[derive(Debug)]
pub(super) struct AccumulationBuffer {
    columns: Vec<ColumnData>,
    pending: usize,
    threshold: usize,
}

impl AccumulationBuffer {
    pub(super) fn new(fields: &[FieldSpec], threshold: usize) -> Self {
        let reserved = threshold.min(MAX_RESERVED_RECORDS);
        let columns = fields
            .iter()
            .map(|f| ColumnData::with_capacity(f.dtype, reserved * f.elements_per_record()))
            .collect();
        Self {
            columns,
            pending: 0,
            threshold,
        }
    }

    /// Checks that `record` carries exactly `fields`, with matching dtypes and
    /// element counts.
    pub(super) fn validate(fields: &[FieldSpec], record: &Record) -> Result<(), StoreError> {
        for (name, _) in record.iter() {
            if !fields.iter().any(|f| f.name == name) {
                return Err(StoreError::InvalidRecord(format!("unknown field '{}'", name)));
            }
        }

        for field in fields {
            let value = record.get(&field.name).ok_or_else(|| {
                StoreError::InvalidRecord(format!("missing field '{}'", field.name))
            })?;
            if value.dtype() != field.dtype {
                return Err(StoreError::InvalidRecord(format!(
                    "field '{}' expects {}, got {}",
                    field.name,
                    field.dtype,
                    value.dtype()
                )));
            }
            let expected = field.elements_per_record();
            if value.len() != expected {
                return Err(StoreError::InvalidRecord(format!(
                    "field '{}' expects {} elements per record (shape {:?}), got {}",
                    field.name,
                    expected,
                    field.record_shape,
                    value.len()
                )));
            }
        }
        Ok(())
    }

    /// Appends a record that already passed [`validate`](Self::validate).
    pub(super) fn append(&mut self, fields: &[FieldSpec], record: &Record) {
        for (column, field) in self.columns.iter_mut().zip(fields) {
            if let Some(value) = record.get(&field.name) {
                column.extend_from(value);
            }
        }
        self.pending += 1;
    }

    #[inline]
    pub(super) fn pending(&self) -> usize {
        self.pending
    }

    #[inline]
    pub(super) fn is_full(&self) -> bool {
        self.pending >= self.threshold
    }

    pub(super) fn columns(&self) -> &[ColumnData] {
        &self.columns
    }

    pub(super) fn clear(&mut self) {
        for column in &mut self.columns {
            column.clear();
        }
        self.pending = 0;
    }
}
