use super::*;
use crate::reader::ArrayStoreReader;
use crate::schema::{DType, FieldSpec};
use std::path::Path;
use tempfile::tempdir;

/// Record with a 2x2x1 image filled with `marker` and the given label
fn marker_record(marker: f32, label: u8) -> Record {
    Record::new()
        .with("images", vec![marker; 4])
        .with("labels", label)
}

fn small_config(path: &Path, capacity: u64, threshold: usize) -> StoreConfig {
    StoreConfig::images_and_labels(path, capacity, [2, 2, 1]).with_buffer_threshold(threshold)
}

#[test]
fn test_flushes_in_threshold_sized_batches() -> Result<(), StoreError> {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scenario.samples");
    let mut writer = ArrayStoreWriter::create(small_config(&path, 10, 4))?;

    let mut cursors = Vec::new();
    for i in 0..10u8 {
        writer.add(&marker_record(100.0 + i as f32, i))?;
        cursors.push(writer.cursor());
    }
    // Flushes happen on the 4th and 8th add; the last 2 records wait for close
    assert_eq!(cursors, vec![0, 0, 0, 4, 4, 4, 4, 8, 8, 8]);
    assert_eq!(writer.pending(), 2);

    let stats = writer.close()?;
    assert_eq!(writer.cursor(), 10);
    assert_eq!(stats.records_written, 10);
    assert_eq!(stats.flushes, 3);
    assert_eq!(stats.largest_flush, 4);
    assert_eq!(stats.bytes_written, 10 * (16 + 1));

    let reader = ArrayStoreReader::open(&path).unwrap();
    let labels = reader.read_field("labels").unwrap();
    assert_eq!(labels.as_u8().unwrap(), &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    let images = reader.read_field("images").unwrap();
    let images = images.as_f32().unwrap();
    for i in 0..10 {
        assert!(images[i * 4..(i + 1) * 4]
            .iter()
            .all(|&v| v == 100.0 + i as f32));
    }
    Ok(())
}

#[test]
fn test_overflow_commits_records_that_fit() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("overflow.samples");
    let mut writer = ArrayStoreWriter::create(small_config(&path, 5, 4)).unwrap();

    for i in 0..5u8 {
        writer.add(&marker_record(i as f32, i)).unwrap();
    }
    let result = writer.add(&marker_record(5.0, 5));
    assert!(matches!(
        result,
        Err(StoreError::CapacityExceeded {
            cursor: 5,
            capacity: 5,
            ..
        })
    ));
    assert_eq!(writer.cursor(), 5);
    assert_eq!(writer.pending(), 0);

    writer.close().unwrap();
    let reader = ArrayStoreReader::open(&path).unwrap();
    assert_eq!(reader.len(), 5);
    assert_eq!(
        reader.read_field("labels").unwrap().as_u8().unwrap(),
        &[0, 1, 2, 3, 4]
    );
}

#[test]
fn test_zero_capacity_rejects_first_record() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.samples");
    let mut writer = ArrayStoreWriter::create(small_config(&path, 0, 4)).unwrap();

    let result = writer.add(&marker_record(1.0, 1));
    assert!(matches!(result, Err(StoreError::CapacityExceeded { .. })));
    assert_eq!(writer.close().unwrap().records_written, 0);
}

#[test]
fn test_double_open_leaves_session_untouched() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("double.samples");
    let mut writer = ArrayStoreWriter::create(small_config(&path, 8, 2)).unwrap();

    writer.add(&marker_record(1.0, 1)).unwrap();
    writer.add(&marker_record(2.0, 2)).unwrap();
    writer.add(&marker_record(3.0, 3)).unwrap();

    let result = writer.open();
    assert!(matches!(result, Err(StoreError::AlreadyOpen(_))));

    // Session continues where it was
    assert!(writer.is_open());
    assert_eq!(writer.cursor(), 2);
    assert_eq!(writer.pending(), 1);

    writer.close().unwrap();
    let reader = ArrayStoreReader::open(&path).unwrap();
    assert_eq!(reader.read_field("labels").unwrap().as_u8().unwrap(), &[1, 2, 3]);
}

#[test]
fn test_add_and_flush_require_open_store() {
    let dir = tempdir().unwrap();
    let mut writer = ArrayStoreWriter::new(small_config(&dir.path().join("closed.samples"), 4, 2));

    assert!(matches!(
        writer.add(&marker_record(0.0, 0)),
        Err(StoreError::NotOpen)
    ));
    assert!(matches!(writer.flush(), Err(StoreError::NotOpen)));
    assert!(!dir.path().join("closed.samples").exists());
}

#[test]
fn test_close_is_idempotent() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("close_twice.samples");
    let mut writer = ArrayStoreWriter::create(small_config(&path, 4, 8)).unwrap();
    writer.add(&marker_record(1.0, 1)).unwrap();

    let first = writer.close().unwrap();
    let second = writer.close().unwrap();
    assert_eq!(first, second);
    assert_eq!(first.flushes, 1);
    assert!(!writer.is_open());
    assert!(matches!(
        writer.add(&marker_record(2.0, 2)),
        Err(StoreError::NotOpen)
    ));
}

#[test]
fn test_flush_on_empty_buffer_is_noop() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("noop.samples");
    let mut writer = ArrayStoreWriter::create(small_config(&path, 4, 8)).unwrap();

    writer.flush().unwrap();
    writer.flush().unwrap();
    assert_eq!(writer.stats().flushes, 0);

    writer.add(&marker_record(1.0, 1)).unwrap();
    writer.flush().unwrap();
    writer.flush().unwrap();
    assert_eq!(writer.stats().flushes, 1);
    assert_eq!(writer.cursor(), 1);
}

#[test]
fn test_unwritten_slots_are_zero() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("partial.samples");
    let mut writer = ArrayStoreWriter::create(small_config(&path, 6, 2)).unwrap();
    for i in 1..=3u8 {
        writer.add(&marker_record(i as f32, i)).unwrap();
    }
    writer.close().unwrap();

    let reader = ArrayStoreReader::open(&path).unwrap();
    let labels = reader.read_field_full("labels").unwrap();
    assert_eq!(labels.as_u8().unwrap(), &[1, 2, 3, 0, 0, 0]);
    let images = reader.read_field_full("images").unwrap();
    assert!(images.as_f32().unwrap()[12..].iter().all(|&v| v == 0.0));
}

#[test]
fn test_invalid_records_are_not_staged() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("invalid.samples");
    let mut writer = ArrayStoreWriter::create(small_config(&path, 4, 8)).unwrap();

    let missing = Record::new().with("images", vec![0.0f32; 4]);
    let wrong_dtype = Record::new()
        .with("images", vec![0u8; 4])
        .with("labels", 1u8);
    let wrong_len = Record::new()
        .with("images", vec![0.0f32; 3])
        .with("labels", 1u8);
    let unknown = marker_record(0.0, 1).with("weights", 0.5f32);

    for record in [missing, wrong_dtype, wrong_len, unknown] {
        assert!(matches!(
            writer.add(&record),
            Err(StoreError::InvalidRecord(_))
        ));
    }
    assert_eq!(writer.pending(), 0);
}

#[test]
fn test_drop_closes_open_store() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dropped.samples");
    {
        let mut writer = ArrayStoreWriter::create(small_config(&path, 4, 8)).unwrap();
        writer.add(&marker_record(7.0, 7)).unwrap();
    }

    let reader = ArrayStoreReader::open(&path).unwrap();
    assert_eq!(reader.len(), 1);
    assert_eq!(reader.read_field("labels").unwrap().as_u8().unwrap(), &[7]);
}

#[test]
fn test_session_closes_on_caller_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.samples");

    let result: Result<((), StoreStats), StoreError> =
        ArrayStoreWriter::with_session(small_config(&path, 4, 8), |writer| {
            writer.add(&marker_record(1.0, 1))?;
            writer.add(&marker_record(2.0, 2))?;
            Err(StoreError::InvalidRecord("caller gave up".to_string()))
        });
    assert!(matches!(result, Err(StoreError::InvalidRecord(_))));

    // Residual buffered records were flushed by the implicit close
    let reader = ArrayStoreReader::open(&path).unwrap();
    assert_eq!(reader.read_field("labels").unwrap().as_u8().unwrap(), &[1, 2]);
}

#[test]
fn test_session_returns_stats() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session_ok.samples");

    let (count, stats) = ArrayStoreWriter::with_session(small_config(&path, 4, 3), |writer| {
        for i in 0..4u8 {
            writer.add(&marker_record(i as f32, i))?;
        }
        Ok::<_, StoreError>(writer.cursor())
    })
    .unwrap();

    assert_eq!(count, 3);
    assert_eq!(stats.records_written, 4);
    assert_eq!(stats.flushes, 2);
}

#[test]
fn test_reopen_starts_a_new_session() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reopen.samples");
    let mut writer = ArrayStoreWriter::create(small_config(&path, 4, 8)).unwrap();
    writer.add(&marker_record(1.0, 1)).unwrap();
    writer.add(&marker_record(2.0, 2)).unwrap();
    writer.close().unwrap();

    writer.open().unwrap();
    assert_eq!(writer.cursor(), 0);
    writer.add(&marker_record(9.0, 9)).unwrap();
    writer.close().unwrap();

    let reader = ArrayStoreReader::open(&path).unwrap();
    assert_eq!(reader.read_field_full("labels").unwrap().as_u8().unwrap(), &[9, 0, 0, 0]);
}

#[test]
fn test_invalid_config_is_rejected_before_io() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.samples");

    let zero_threshold = small_config(&path, 4, 0);
    assert!(matches!(
        ArrayStoreWriter::create(zero_threshold),
        Err(StoreError::InvalidConfig(_))
    ));

    let duplicate = StoreConfig::new(
        &path,
        4,
        vec![
            FieldSpec::scalar("labels", DType::U8),
            FieldSpec::scalar("labels", DType::U16),
        ],
    );
    assert!(matches!(
        ArrayStoreWriter::create(duplicate),
        Err(StoreError::InvalidConfig(_))
    ));

    let no_fields = StoreConfig::new(&path, 4, Vec::new());
    assert!(matches!(
        ArrayStoreWriter::create(no_fields),
        Err(StoreError::InvalidConfig(_))
    ));
    assert!(!path.exists());
}

#[test]
fn test_overflowing_shapes_are_rejected_before_io() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("huge.samples");

    // Element count overflows usize
    let huge_record = StoreConfig::new(
        &path,
        4,
        vec![
            FieldSpec::new("images", DType::F32, vec![1 << 40, 1 << 40]),
            FieldSpec::scalar("labels", DType::U8),
        ],
    );
    assert!(matches!(
        ArrayStoreWriter::create(huge_record),
        Err(StoreError::InvalidConfig(_))
    ));

    // Each region fits on its own, the sum of them does not
    let huge_total = StoreConfig::new(
        &path,
        1 << 40,
        vec![
            FieldSpec::new("images", DType::F64, vec![1 << 20]),
            FieldSpec::new("more", DType::F64, vec![1 << 20]),
        ],
    );
    assert!(matches!(
        ArrayStoreWriter::create(huge_total),
        Err(StoreError::InvalidConfig(_))
    ));
    assert!(!path.exists());
}

#[test]
fn test_open_reports_io_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing_dir").join("store.samples");
    let result = ArrayStoreWriter::create(small_config(&path, 4, 2));
    assert!(matches!(result, Err(StoreError::IoError(_))));
}

#[test]
fn test_custom_field_types() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("custom.samples");
    let config = StoreConfig::new(
        &path,
        3,
        vec![
            FieldSpec::new("embedding", DType::F64, vec![2]),
            FieldSpec::scalar("id", DType::I64),
            FieldSpec::scalar("class", DType::U16),
        ],
    )
    .with_buffer_threshold(2);

    let mut writer = ArrayStoreWriter::create(config).unwrap();
    for i in 0..3i64 {
        let record = Record::new()
            .with("embedding", vec![i as f64, -(i as f64)])
            .with("id", 1000 + i)
            .with("class", i as u16 * 3);
        writer.add(&record).unwrap();
    }
    writer.close().unwrap();

    let reader = ArrayStoreReader::open(&path).unwrap();
    assert_eq!(
        reader.read_field("id").unwrap().as_i64().unwrap(),
        &[1000, 1001, 1002]
    );
    assert_eq!(
        reader.read_field("class").unwrap().as_u16().unwrap(),
        &[0, 3, 6]
    );
    assert_eq!(
        reader.read_field("embedding").unwrap().as_f64().unwrap(),
        &[0.0, -0.0, 1.0, -1.0, 2.0, -2.0]
    );
}

#[test]
fn test_record_insert_replaces_value() {
    let mut record = marker_record(1.0, 1);
    record.insert("labels", 4u8);
    assert_eq!(record.len(), 2);
    assert_eq!(record.get("labels"), Some(&ColumnData::U8(vec![4])));
}

#[test]
fn test_column_data_le_encoding() {
    let column = ColumnData::from(vec![1.5f32, -2.0]);
    let bytes = column.to_le_bytes();
    assert_eq!(bytes.len(), 8);
    assert_eq!(&bytes[..4], &1.5f32.to_le_bytes());
    assert_eq!(ColumnData::from_le_bytes(DType::F32, &bytes), column);
}
