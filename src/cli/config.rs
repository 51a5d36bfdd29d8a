//! TOML configuration file support.
//!
//! Every setting of the `ingest` command can also come from a config file;
//! flags given on the command line win over the file:
//!
//! ```toml
//! # samplestore.toml
//! [store]
//! output = "files.samples"
//! image_key = "images"
//! label_key = "labels"
//! buffer_size = 512
//!
//! [pipeline]
//! mode = "both"
//! workers = 8
//! resize = "300x300"
//! seed = 42
//!
//! [source]
//! count = 10000
//! shape = "28x28x1"
//! seed = 0
//! ```
//!
//! `[pipeline]` may replace the default augmentation with explicit steps:
//!
//! ```toml
//! [[pipeline.steps]]
//! op = "resize"
//! height = 64
//! width = 64
//!
//! [[pipeline.steps]]
//! op = "horizontal_flip"
//! p = 0.5
//! ```

use anyhow::{Context, Result};
use samplestore::augment::AugmentStep;
use samplestore::ingest::IngestMode;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration structure for samplestore.toml files.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Store layout and buffering.
    #[serde(default)]
    pub store: StoreSection,

    /// Feeder and augmentation settings.
    #[serde(default)]
    pub pipeline: PipelineSection,

    /// Synthetic sample source.
    #[serde(default)]
    pub source: SourceSection,
}

/// `[store]` table
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    /// Output store path.
    pub output: Option<PathBuf>,

    /// Name of the image field.
    pub image_key: Option<String>,

    /// Name of the label field.
    pub label_key: Option<String>,

    /// Records buffered before each flush.
    pub buffer_size: Option<usize>,
}

/// `[pipeline]` table
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineSection {
    /// sequential, parallel or both.
    pub mode: Option<IngestMode>,

    /// Worker threads for the parallel run.
    pub workers: Option<usize>,

    /// Output image size, `HxW`.
    pub resize: Option<String>,

    /// Augmentation seed.
    pub seed: Option<u64>,

    /// Explicit augmentation steps.
    pub steps: Option<Vec<AugmentStep>>,
}

/// `[source]` table
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSection {
    /// Number of samples to generate.
    pub count: Option<usize>,

    /// Sample shape, `HxW` or `HxWxC`.
    pub shape: Option<String>,

    /// Noise seed of the generated samples.
    pub seed: Option<u64>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [store]
            output = "out/digits.samples"
            buffer_size = 256

            [pipeline]
            mode = "parallel"
            workers = 6
            resize = "64x64"
            seed = 42

            [source]
            count = 1000
            shape = "28x28"
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.store.output, Some(PathBuf::from("out/digits.samples")));
        assert_eq!(config.store.buffer_size, Some(256));
        assert_eq!(config.store.image_key, None);
        assert_eq!(config.pipeline.mode, Some(IngestMode::Parallel));
        assert_eq!(config.pipeline.workers, Some(6));
        assert_eq!(config.pipeline.resize.as_deref(), Some("64x64"));
        assert_eq!(config.pipeline.seed, Some(42));
        assert_eq!(config.source.count, Some(1000));
        assert_eq!(config.source.shape.as_deref(), Some("28x28"));
    }

    #[test]
    fn test_pipeline_steps() {
        let toml = r#"
            [[pipeline.steps]]
            op = "resize"
            height = 32
            width = 48

            [[pipeline.steps]]
            op = "horizontal_flip"
            p = 1.0
        "#;

        let config = Config::from_str(toml).unwrap();
        let steps = config.pipeline.steps.unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(
            steps[0],
            AugmentStep::Resize {
                height: 32,
                width: 48
            }
        );
    }

    #[test]
    fn test_empty_config() {
        let config = Config::from_str("").unwrap();
        assert!(config.store.output.is_none());
        assert!(config.pipeline.mode.is_none());
        assert!(config.source.count.is_none());
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(Config::from_str("[store]\ncompression = 3\n").is_err());
        assert!(Config::from_str("[pipeline]\nmode = \"sideways\"\n").is_err());
    }
}
