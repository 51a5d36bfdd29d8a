//! # Ingest Orchestration
//!
//! Wires a [`SampleSource`], an [`AugmentPipeline`] and one
//! [`ArrayStoreWriter`] per run together:
//!
//! 1. The store is preallocated for every sample in the source, with the
//!    image field shaped like the pipeline's output.
//! 2. The sequential and/or parallel feeder fills it.
//! 3. The store is closed on every exit path, even when the run fails.
//!
//! In [`IngestMode::Both`] each run writes its own store
//! (`<stem>-sequential.<ext>` and `<stem>-parallel.<ext>`), and the label
//! sequences of the two stores are compared afterwards. Any difference means
//! the parallel path broke sample-to-slot ordering.

use std::fmt;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::augment::{AugmentError, AugmentPipeline, AugmentStep};
use crate::feeder::{
    CancellationToken, FeedError, FeedStats, Feeder, FeederConfig, TransformError,
};
use crate::reader::{ArrayStoreReader, ReaderError};
use crate::sample::{RawSample, SampleSource};
use crate::schema::{
    image_label_fields, DEFAULT_BUFFER_THRESHOLD, DEFAULT_IMAGE_KEY, DEFAULT_LABEL_KEY,
    STORE_EXTENSION,
};
use crate::writer::{ArrayStoreWriter, Record, StoreConfig, StoreError, StoreStats};

/// Errors raised by an ingest run
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Store could not be opened, written or closed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Feeder aborted
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    /// A finished store could not be read back
    #[error("Reader error: {0}")]
    Reader(#[from] ReaderError),

    /// Augmentation pipeline could not be built
    #[error("Augmentation error: {0}")]
    Augment(#[from] AugmentError),

    /// Unusable ingest configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Sequential and parallel stores disagree on a label
    #[error("Sequential and parallel stores disagree at record {index}")]
    LabelMismatch {
        /// First differing record
        index: u64,
    },
}

/// Which feeder paths to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    /// Single-threaded baseline only
    Sequential,
    /// Worker pool only
    Parallel,
    /// Both, each into its own store, then compare
    #[default]
    Both,
}

impl IngestMode {
    fn runs(self) -> &'static [IngestMode] {
        match self {
            IngestMode::Sequential => &[IngestMode::Sequential],
            IngestMode::Parallel => &[IngestMode::Parallel],
            IngestMode::Both => &[IngestMode::Sequential, IngestMode::Parallel],
        }
    }

    /// Lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            IngestMode::Sequential => "sequential",
            IngestMode::Parallel => "parallel",
            IngestMode::Both => "both",
        }
    }
}

impl fmt::Display for IngestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Settings for [`run_ingest`]
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Store path. In `Both` mode the run name is appended to the stem.
    pub output: PathBuf,
    /// Image field name
    pub image_key: String,
    /// Label field name
    pub label_key: String,
    /// Records buffered before each flush
    pub buffer_threshold: usize,
    /// Worker threads for the parallel run (`None`: one per core)
    pub worker_count: Option<usize>,
    /// Output image size as (height, width) for the default pipeline
    pub resize: (usize, usize),
    /// Explicit augmentation steps replacing the default pipeline
    pub steps: Option<Vec<AugmentStep>>,
    /// Seed making the augmentation deterministic
    pub seed: Option<u64>,
    /// Runs to perform
    pub mode: IngestMode,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from(format!("files.{}", STORE_EXTENSION)),
            image_key: DEFAULT_IMAGE_KEY.to_string(),
            label_key: DEFAULT_LABEL_KEY.to_string(),
            buffer_threshold: DEFAULT_BUFFER_THRESHOLD,
            worker_count: None,
            resize: (300, 300),
            steps: None,
            seed: None,
            mode: IngestMode::Both,
        }
    }
}

impl IngestConfig {
    /// Default settings writing to `output`
    pub fn new<P: AsRef<Path>>(output: P) -> Self {
        Self {
            output: output.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Check settings that would otherwise fail midway through a run
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.image_key.is_empty() || self.label_key.is_empty() {
            return Err(IngestError::InvalidConfig(
                "field keys must not be empty".to_string(),
            ));
        }
        if self.image_key == self.label_key {
            return Err(IngestError::InvalidConfig(format!(
                "image and label keys are both '{}'",
                self.image_key
            )));
        }
        if self.buffer_threshold == 0 {
            return Err(IngestError::InvalidConfig(
                "buffer size must be at least 1".to_string(),
            ));
        }
        if self.worker_count == Some(0) {
            return Err(IngestError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Augmentation pipeline described by these settings
    pub fn pipeline(&self) -> Result<AugmentPipeline, IngestError> {
        let pipeline = match &self.steps {
            Some(steps) => AugmentPipeline::new(steps.clone())?,
            None => AugmentPipeline::default_pipeline(self.resize.0, self.resize.1)?,
        };
        Ok(match self.seed {
            Some(seed) => pipeline.with_seed(seed),
            None => pipeline,
        })
    }

    /// Store path used by `run`
    pub fn run_path(&self, run: IngestMode) -> PathBuf {
        if self.mode != IngestMode::Both {
            return self.output.clone();
        }
        let stem = self
            .output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "files".to_string());
        let ext = self
            .output
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| STORE_EXTENSION.to_string());
        self.output.with_file_name(format!("{}-{}.{}", stem, run.name(), ext))
    }

    fn feeder(&self, cancel: Option<&CancellationToken>) -> Feeder {
        let config = match self.worker_count {
            Some(n) => FeederConfig::with_workers(n),
            None => FeederConfig::default(),
        };
        let feeder = Feeder::new(config);
        match cancel {
            Some(token) => feeder.with_cancellation(token.clone()),
            None => feeder,
        }
    }
}

/// Outcome of one run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// `Sequential` or `Parallel`
    pub mode: IngestMode,
    /// Store written by this run
    pub path: PathBuf,
    /// Writer statistics
    pub store: StoreStats,
    /// Feeder statistics
    pub feed: FeedStats,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}: {} | {}",
            self.mode,
            self.path.display(),
            self.feed,
            self.store
        )
    }
}

/// Outcome of [`run_ingest`]
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// One entry per run, in execution order
    pub runs: Vec<RunReport>,
}

impl IngestReport {
    /// Report of the run in `mode`, if it was performed
    pub fn run(&self, mode: IngestMode) -> Option<&RunReport> {
        self.runs.iter().find(|r| r.mode == mode)
    }

    /// Sequential elapsed time divided by parallel elapsed time
    pub fn speedup(&self) -> Option<f64> {
        let sequential = self.run(IngestMode::Sequential)?.feed.elapsed.as_secs_f64();
        let parallel = self.run(IngestMode::Parallel)?.feed.elapsed.as_secs_f64();
        (parallel > 0.0).then(|| sequential / parallel)
    }
}

/// Ingest every sample of `source` according to `config`.
pub fn run_ingest<S: SampleSource>(
    source: &S,
    config: &IngestConfig,
) -> Result<IngestReport, IngestError> {
    run_ingest_with_cancel(source, config, None)
}

/// [`run_ingest`] with a cancellation token shared by every run.
///
/// A cancelled run still closes its store, keeping the records that were
/// forwarded before the cancellation. The label comparison is skipped when
/// any run was cancelled.
pub fn run_ingest_with_cancel<S: SampleSource>(
    source: &S,
    config: &IngestConfig,
    cancel: Option<&CancellationToken>,
) -> Result<IngestReport, IngestError> {
    config.validate()?;
    let pipeline = config.pipeline()?;
    let feeder = config.feeder(cancel);

    let image_shape = pipeline.output_shape(source.sample_shape());
    let capacity = source.len() as u64;
    info!(
        "Ingesting {} samples of {} as {} ({} mode)",
        capacity,
        source.sample_shape(),
        image_shape,
        config.mode
    );

    let image_key = config.image_key.as_str();
    let label_key = config.label_key.as_str();
    let transform = |sample: RawSample| -> Result<Record, TransformError> {
        Ok(pipeline.process(sample)?.into_record(image_key, label_key))
    };

    let mut report = IngestReport::default();
    for &mode in config.mode.runs() {
        let path = config.run_path(mode);
        let store_config = StoreConfig::new(
            &path,
            capacity,
            image_label_fields(image_key, label_key, image_shape.to_array()),
        )
        .with_buffer_threshold(config.buffer_threshold);

        info!("Starting {} run into {}", mode, path.display());
        let (feed, store) = ArrayStoreWriter::with_session(store_config, |writer| match mode {
            IngestMode::Parallel => feeder.run_parallel(source.samples(), &transform, writer),
            _ => feeder.run_sequential(source.samples(), &transform, writer),
        })?;
        info!(
            "{} run finished in {:.3}s ({:.1} samples/s)",
            mode,
            feed.elapsed.as_secs_f64(),
            feed.throughput()
        );

        report.runs.push(RunReport {
            mode,
            path,
            store,
            feed,
        });
    }

    if config.mode == IngestMode::Both && !report.runs.iter().any(|r| r.feed.cancelled) {
        compare_labels(&report.runs[0].path, &report.runs[1].path, label_key)?;
        info!("Sequential and parallel stores hold identical label sequences");
        if let Some(speedup) = report.speedup() {
            info!("Parallel speedup: {:.2}x", speedup);
        }
    }

    Ok(report)
}

/// Compare the label field of two completed stores record by record.
pub fn compare_labels(left: &Path, right: &Path, label_key: &str) -> Result<(), IngestError> {
    let left = ArrayStoreReader::open(left)?.read_field(label_key)?;
    let right = ArrayStoreReader::open(right)?.read_field(label_key)?;

    if left == right {
        return Ok(());
    }
    let index = (0..left.len().min(right.len()))
        .find(|&i| left.slice(i, i + 1) != right.slice(i, i + 1))
        .unwrap_or_else(|| left.len().min(right.len()));
    Err(IngestError::LabelMismatch {
        index: index as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::SyntheticDigits;
    use tempfile::tempdir;

    fn small_config(output: PathBuf, mode: IngestMode) -> IngestConfig {
        IngestConfig {
            output,
            resize: (12, 12),
            buffer_threshold: 16,
            worker_count: Some(3),
            seed: Some(5),
            mode,
            ..IngestConfig::default()
        }
    }

    #[test]
    fn test_run_paths() {
        let config = IngestConfig::new("/data/out/files.samples");
        assert_eq!(
            config.run_path(IngestMode::Sequential),
            PathBuf::from("/data/out/files-sequential.samples")
        );
        assert_eq!(
            config.run_path(IngestMode::Parallel),
            PathBuf::from("/data/out/files-parallel.samples")
        );

        let single = IngestConfig {
            mode: IngestMode::Parallel,
            ..IngestConfig::new("plain.bin")
        };
        assert_eq!(single.run_path(IngestMode::Parallel), PathBuf::from("plain.bin"));
    }

    #[test]
    fn test_both_mode_writes_identical_stores() {
        let dir = tempdir().unwrap();
        let config = small_config(dir.path().join("digits.samples"), IngestMode::Both);
        let source = SyntheticDigits::new(50);

        let report = run_ingest(&source, &config).unwrap();
        assert_eq!(report.runs.len(), 2);

        let sequential = ArrayStoreReader::open(&report.runs[0].path).unwrap();
        let parallel = ArrayStoreReader::open(&report.runs[1].path).unwrap();
        assert_eq!(sequential.len(), 50);
        assert_eq!(
            sequential.field("images").unwrap().record_shape,
            vec![12, 12, 1]
        );
        // Seeded augmentation: the two runs agree on every pixel too
        assert_eq!(
            sequential.read_field("images").unwrap(),
            parallel.read_field("images").unwrap()
        );

        let labels = parallel.read_field("labels").unwrap();
        let expected: Vec<u8> = (0..50).map(|i| (i % 10) as u8).collect();
        assert_eq!(labels.as_u8(), Some(expected.as_slice()));
        assert_eq!(report.run(IngestMode::Parallel).unwrap().store.records_written, 50);
    }

    #[test]
    fn test_single_mode_uses_output_path() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("only.samples");
        let config = small_config(output.clone(), IngestMode::Sequential);

        let report = run_ingest(&SyntheticDigits::new(7), &config).unwrap();
        assert_eq!(report.runs.len(), 1);
        assert_eq!(report.runs[0].path, output);
        assert!(report.speedup().is_none());
        assert_eq!(ArrayStoreReader::open(&output).unwrap().len(), 7);
    }

    #[test]
    fn test_custom_keys_and_steps() {
        let dir = tempdir().unwrap();
        let config = IngestConfig {
            image_key: "x".to_string(),
            label_key: "y".to_string(),
            steps: Some(vec![AugmentStep::HorizontalFlip { p: 1.0 }]),
            ..small_config(dir.path().join("custom.samples"), IngestMode::Parallel)
        };

        let report = run_ingest(&SyntheticDigits::new(4), &config).unwrap();
        let reader = ArrayStoreReader::open(&report.runs[0].path).unwrap();
        assert_eq!(reader.field("x").unwrap().record_shape, vec![28, 28, 1]);
        assert_eq!(reader.read_field("y").unwrap().as_u8(), Some(&[0, 1, 2, 3][..]));
    }

    #[test]
    fn test_compare_labels_reports_first_difference() {
        let dir = tempdir().unwrap();
        let write = |name: &str, labels: &[u8]| {
            let path = dir.path().join(name);
            let config = StoreConfig::new(
                &path,
                labels.len() as u64,
                vec![crate::schema::FieldSpec::scalar("labels", crate::schema::DType::U8)],
            );
            let mut writer = ArrayStoreWriter::create(config).unwrap();
            for &label in labels {
                writer.add(&Record::new().with("labels", label)).unwrap();
            }
            writer.close().unwrap();
            path
        };

        let a = write("a.samples", &[1, 2, 3, 4]);
        let b = write("b.samples", &[1, 2, 9, 4]);
        let c = write("c.samples", &[1, 2, 3, 4]);

        assert!(compare_labels(&a, &c, "labels").is_ok());
        assert!(matches!(
            compare_labels(&a, &b, "labels"),
            Err(IngestError::LabelMismatch { index: 2 })
        ));
    }

    #[test]
    fn test_invalid_configs() {
        let base = IngestConfig::default();
        let same_keys = IngestConfig {
            label_key: base.image_key.clone(),
            ..base.clone()
        };
        assert!(matches!(same_keys.validate(), Err(IngestError::InvalidConfig(_))));

        let no_workers = IngestConfig {
            worker_count: Some(0),
            ..base.clone()
        };
        assert!(no_workers.validate().is_err());

        let bad_steps = IngestConfig {
            steps: Some(vec![AugmentStep::HorizontalFlip { p: 2.0 }]),
            ..base
        };
        assert!(matches!(bad_steps.pipeline(), Err(IngestError::Augment(_))));
    }

    #[test]
    fn test_cancelled_run_keeps_committed_records() {
        let dir = tempdir().unwrap();
        let config = small_config(dir.path().join("cancel.samples"), IngestMode::Both);
        let token = CancellationToken::new();
        token.cancel();

        let report = run_ingest_with_cancel(&SyntheticDigits::new(30), &config, Some(&token)).unwrap();
        assert!(report.runs.iter().all(|r| r.feed.cancelled));
        for run in &report.runs {
            let reader = ArrayStoreReader::open(&run.path).unwrap();
            assert!(reader.is_empty());
            assert_eq!(reader.capacity(), 30);
        }
    }
}
