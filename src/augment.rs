//! # Image Augmentation Pipeline
//!
//! A fixed sequence of [`AugmentStep`]s applied to every sample:
//!
//! | Step | Effect |
//! |------|--------|
//! | `Resize` | bilinear resampling to a fixed height × width |
//! | `HorizontalFlip` | mirror left/right with probability `p` |
//! | `RandomGamma` | `255 · (v / 255)^(g / 100)` with `g` drawn from `[low, high]`, probability `p` |
//!
//! Labels pass through untouched. Pixel values stay on the 0–255 scale as
//! `f32`.
//!
//! ## Randomness
//!
//! Unseeded pipelines draw from the thread-local RNG. A seeded pipeline
//! derives a fresh RNG per sample from the seed and the sample's content,
//! so the output for a sample does not depend on which thread processed
//! it or in what order.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::feeder::{Transform, TransformError};
use crate::sample::{ImageShape, ProcessedSample, RawSample};

/// Errors raised while building or applying a pipeline
#[derive(Debug, thiserror::Error)]
pub enum AugmentError {
    /// A step has out-of-range parameters
    #[error("Invalid augmentation step: {0}")]
    InvalidStep(String),

    /// Sample has a zero-sized dimension
    #[error("Sample has an empty shape {0}")]
    EmptyImage(ImageShape),

    /// Pixel buffer does not match the declared shape
    #[error("Sample has {actual} values, shape {shape} requires {expected}")]
    ShapeMismatch {
        /// Declared shape
        shape: ImageShape,
        /// Values the shape requires
        expected: usize,
        /// Values present
        actual: usize,
    },
}

/// One augmentation operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AugmentStep {
    /// Bilinear resize to `height × width`
    Resize {
        /// Output rows
        height: usize,
        /// Output columns
        width: usize,
    },
    /// Mirror columns with probability `p`
    HorizontalFlip {
        /// Probability of flipping
        p: f64,
    },
    /// Gamma correction with probability `p`, exponent in percent
    RandomGamma {
        /// Lowest exponent, in percent
        low: u32,
        /// Highest exponent, in percent
        high: u32,
        /// Probability of applying
        p: f64,
    },
}

impl AugmentStep {
    fn validate(&self) -> Result<(), AugmentError> {
        let check_p = |p: f64| {
            if (0.0..=1.0).contains(&p) {
                Ok(())
            } else {
                Err(AugmentError::InvalidStep(format!(
                    "probability {} outside [0, 1]",
                    p
                )))
            }
        };

        match *self {
            AugmentStep::Resize { height, width } => {
                if height == 0 || width == 0 {
                    return Err(AugmentError::InvalidStep(format!(
                        "resize to {}x{}",
                        height, width
                    )));
                }
                Ok(())
            }
            AugmentStep::HorizontalFlip { p } => check_p(p),
            AugmentStep::RandomGamma { low, high, p } => {
                if low == 0 || low > high {
                    return Err(AugmentError::InvalidStep(format!(
                        "gamma range [{}, {}]",
                        low, high
                    )));
                }
                check_p(p)
            }
        }
    }
}

/// Working image: f32 pixels plus their shape
struct Image {
    pixels: Vec<f32>,
    shape: ImageShape,
}

impl Image {
    fn resize(self, height: usize, width: usize) -> Image {
        let src = self.shape;
        if src.height == height && src.width == width {
            return self;
        }
        let channels = src.channels;
        let scale_y = src.height as f32 / height as f32;
        let scale_x = src.width as f32 / width as f32;

        // Pixel-centre mapping, edges clamped
        let sample_axis = |dst: usize, scale: f32, len: usize| -> (usize, usize, f32) {
            let pos = ((dst as f32 + 0.5) * scale - 0.5).clamp(0.0, (len - 1) as f32);
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(len - 1);
            (lo, hi, pos - lo as f32)
        };

        let mut out = Vec::with_capacity(height * width * channels);
        for y in 0..height {
            let (y0, y1, fy) = sample_axis(y, scale_y, src.height);
            for x in 0..width {
                let (x0, x1, fx) = sample_axis(x, scale_x, src.width);
                for c in 0..channels {
                    let at = |row: usize, col: usize| self.pixels[(row * src.width + col) * channels + c];
                    let top = at(y0, x0) * (1.0 - fx) + at(y0, x1) * fx;
                    let bottom = at(y1, x0) * (1.0 - fx) + at(y1, x1) * fx;
                    out.push(top * (1.0 - fy) + bottom * fy);
                }
            }
        }

        Image {
            pixels: out,
            shape: src.with_size(height, width),
        }
    }

    fn flip_horizontal(&mut self) {
        let row_len = self.shape.width * self.shape.channels;
        let channels = self.shape.channels;
        for row in self.pixels.chunks_exact_mut(row_len) {
            let width = self.shape.width;
            for x in 0..width / 2 {
                let mirror = width - 1 - x;
                for c in 0..channels {
                    row.swap(x * channels + c, mirror * channels + c);
                }
            }
        }
    }

    fn apply_gamma(&mut self, gamma: f32) {
        for v in &mut self.pixels {
            *v = 255.0 * (*v / 255.0).max(0.0).powf(gamma);
        }
    }
}

/// Ordered list of augmentation steps
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentPipeline {
    steps: Vec<AugmentStep>,
    seed: Option<u64>,
}

impl AugmentPipeline {
    /// Build a pipeline, rejecting out-of-range step parameters
    pub fn new(steps: Vec<AugmentStep>) -> Result<Self, AugmentError> {
        for step in &steps {
            step.validate()?;
        }
        Ok(Self { steps, seed: None })
    }

    /// Resize, flip, random gamma in [0.8, 1.2], flip
    pub fn default_pipeline(height: usize, width: usize) -> Result<Self, AugmentError> {
        Self::new(vec![
            AugmentStep::Resize { height, width },
            AugmentStep::HorizontalFlip { p: 0.5 },
            AugmentStep::RandomGamma {
                low: 80,
                high: 120,
                p: 0.5,
            },
            AugmentStep::HorizontalFlip { p: 0.5 },
        ])
    }

    /// Make the output a pure function of the seed and the sample.
    ///
    /// Each sample draws from its own RNG keyed on the seed, the sample's
    /// source index and its contents, so the result does not depend on
    /// which thread processes it or in what order. Identical images at
    /// different indices are augmented independently.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Steps in application order
    pub fn steps(&self) -> &[AugmentStep] {
        &self.steps
    }

    /// Seed, if any
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Shape of the output for an input of shape `input`
    pub fn output_shape(&self, input: ImageShape) -> ImageShape {
        self.steps.iter().fold(input, |shape, step| match *step {
            AugmentStep::Resize { height, width } => shape.with_size(height, width),
            _ => shape,
        })
    }

    /// Apply every step to `sample`
    pub fn process(&self, sample: RawSample) -> Result<ProcessedSample, AugmentError> {
        match self.seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed ^ sample_key(&sample));
                self.process_with(sample, &mut rng)
            }
            None => self.process_with(sample, &mut rand::rng()),
        }
    }

    /// Apply every step to `sample`, drawing randomness from `rng`
    pub fn process_with<R: Rng + ?Sized>(
        &self,
        sample: RawSample,
        rng: &mut R,
    ) -> Result<ProcessedSample, AugmentError> {
        if sample.shape.is_empty() {
            return Err(AugmentError::EmptyImage(sample.shape));
        }
        let expected = sample.shape.len();
        if sample.pixels.len() != expected {
            return Err(AugmentError::ShapeMismatch {
                shape: sample.shape,
                expected,
                actual: sample.pixels.len(),
            });
        }

        let mut image = Image {
            pixels: sample.pixels.into_iter().map(f32::from).collect(),
            shape: sample.shape,
        };

        for step in &self.steps {
            match *step {
                AugmentStep::Resize { height, width } => image = image.resize(height, width),
                AugmentStep::HorizontalFlip { p } => {
                    if rng.random_bool(p) {
                        image.flip_horizontal();
                    }
                }
                AugmentStep::RandomGamma { low, high, p } => {
                    if rng.random_bool(p) {
                        let percent = rng.random_range(f64::from(low)..=f64::from(high));
                        image.apply_gamma((percent / 100.0) as f32);
                    }
                }
            }
        }

        Ok(ProcessedSample {
            pixels: image.pixels,
            shape: image.shape,
            label: sample.label,
        })
    }
}

impl Transform<RawSample> for AugmentPipeline {
    type Output = ProcessedSample;

    fn apply(&self, input: RawSample) -> Result<ProcessedSample, TransformError> {
        Ok(self.process(input)?)
    }
}

/// FNV-1a over index, label and pixels
fn sample_key(sample: &RawSample) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;

    sample
        .index
        .to_le_bytes()
        .into_iter()
        .chain(std::iter::once(sample.label))
        .chain(sample.pixels.iter().copied())
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{SampleSource, SyntheticDigits};

    fn gradient(height: usize, width: usize) -> RawSample {
        RawSample {
            pixels: (0..height * width).map(|v| (v * 10) as u8).collect(),
            shape: ImageShape::new(height, width, 1),
            label: 4,
            index: 0,
        }
    }

    #[test]
    fn test_resize_changes_shape_and_keeps_label() {
        let pipeline = AugmentPipeline::new(vec![AugmentStep::Resize {
            height: 6,
            width: 9,
        }])
        .unwrap();

        let out = pipeline.process(gradient(2, 3)).unwrap();
        assert_eq!(out.shape, ImageShape::new(6, 9, 1));
        assert_eq!(out.pixels.len(), 54);
        assert_eq!(out.label, 4);
        assert_eq!(pipeline.output_shape(ImageShape::new(2, 3, 1)), out.shape);
    }

    #[test]
    fn test_resize_of_constant_image_is_constant() {
        let raw = RawSample {
            pixels: vec![77; 5 * 5 * 3],
            shape: ImageShape::new(5, 5, 3),
            label: 1,
            index: 0,
        };
        let pipeline = AugmentPipeline::new(vec![AugmentStep::Resize {
            height: 13,
            width: 8,
        }])
        .unwrap();
        let out = pipeline.process(raw).unwrap();
        assert!(out.pixels.iter().all(|&v| (v - 77.0).abs() < 1e-4));
    }

    #[test]
    fn test_same_size_resize_is_identity() {
        let pipeline = AugmentPipeline::new(vec![AugmentStep::Resize {
            height: 2,
            width: 3,
        }])
        .unwrap();
        let out = pipeline.process(gradient(2, 3)).unwrap();
        assert_eq!(out.pixels, vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0]);
    }

    #[test]
    fn test_certain_flip_mirrors_rows() {
        let pipeline = AugmentPipeline::new(vec![AugmentStep::HorizontalFlip { p: 1.0 }]).unwrap();
        let out = pipeline.process(gradient(2, 3)).unwrap();
        assert_eq!(out.pixels, vec![20.0, 10.0, 0.0, 50.0, 40.0, 30.0]);

        let never = AugmentPipeline::new(vec![AugmentStep::HorizontalFlip { p: 0.0 }]).unwrap();
        let out = never.process(gradient(2, 3)).unwrap();
        assert_eq!(out.pixels, vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0]);
    }

    #[test]
    fn test_flip_keeps_channels_together() {
        let raw = RawSample {
            pixels: vec![1, 2, 3, 4, 5, 6],
            shape: ImageShape::new(1, 2, 3),
            label: 0,
            index: 0,
        };
        let pipeline = AugmentPipeline::new(vec![AugmentStep::HorizontalFlip { p: 1.0 }]).unwrap();
        let out = pipeline.process(raw).unwrap();
        assert_eq!(out.pixels, vec![4.0, 5.0, 6.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_gamma_formula() {
        let raw = RawSample {
            pixels: vec![0, 64, 255],
            shape: ImageShape::new(1, 3, 1),
            label: 2,
            index: 0,
        };
        let pipeline = AugmentPipeline::new(vec![AugmentStep::RandomGamma {
            low: 200,
            high: 200,
            p: 1.0,
        }])
        .unwrap();
        let out = pipeline.process(raw).unwrap();

        let expected = 255.0 * (64.0f32 / 255.0).powf(2.0);
        assert_eq!(out.pixels[0], 0.0);
        assert!((out.pixels[1] - expected).abs() < 1e-3);
        assert!((out.pixels[2] - 255.0).abs() < 1e-3);
    }

    #[test]
    fn test_seeded_pipeline_is_deterministic() {
        let source = SyntheticDigits::new(20);
        let pipeline = AugmentPipeline::default_pipeline(40, 40).unwrap().with_seed(99);

        let first: Vec<_> = source.samples().map(|s| pipeline.process(s).unwrap()).collect();
        // Processing in reverse order must not change any output
        let mut reversed: Vec<_> = source
            .samples()
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .map(|s| pipeline.process(s).unwrap())
            .collect();
        reversed.reverse();

        assert_eq!(first, reversed);
        assert!(first.iter().enumerate().all(|(i, s)| s.label == (i % 10) as u8));
    }

    #[test]
    fn test_seeded_pipeline_varies_repeated_images() {
        let pipeline = AugmentPipeline::new(vec![AugmentStep::RandomGamma {
            low: 50,
            high: 200,
            p: 1.0,
        }])
        .unwrap()
        .with_seed(7);
        let at = |index: u64| RawSample {
            pixels: vec![64; 4],
            shape: ImageShape::new(2, 2, 1),
            label: 3,
            index,
        };

        let outputs: Vec<f32> = (0..8)
            .map(|i| pipeline.process(at(i)).unwrap().pixels[0])
            .collect();
        assert!(outputs.iter().any(|&v| v != outputs[0]));

        // Same index, same draw
        assert_eq!(
            pipeline.process(at(5)).unwrap(),
            pipeline.process(at(5)).unwrap()
        );
    }

    #[test]
    fn test_default_pipeline_output() {
        let pipeline = AugmentPipeline::default_pipeline(300, 300).unwrap();
        assert_eq!(pipeline.steps().len(), 4);
        assert_eq!(pipeline.seed(), None);

        let sample = SyntheticDigits::new(1).load(0).unwrap();
        let out = pipeline.apply(sample).unwrap();
        assert_eq!(out.shape, ImageShape::new(300, 300, 1));
        assert_eq!(out.pixels.len(), 90_000);
        assert!(out.pixels.iter().all(|v| (-1e-3..=255.001).contains(v)));
    }

    #[test]
    fn test_rejects_invalid_steps() {
        assert!(AugmentPipeline::new(vec![AugmentStep::HorizontalFlip { p: 1.5 }]).is_err());
        assert!(AugmentPipeline::new(vec![AugmentStep::Resize { height: 0, width: 3 }]).is_err());
        assert!(AugmentPipeline::new(vec![AugmentStep::RandomGamma {
            low: 120,
            high: 80,
            p: 0.5
        }])
        .is_err());
    }

    #[test]
    fn test_shape_mismatch_is_a_transform_error() {
        let pipeline = AugmentPipeline::default_pipeline(8, 8).unwrap();
        let broken = RawSample {
            pixels: vec![0; 10],
            shape: ImageShape::new(4, 4, 1),
            label: 0,
            index: 0,
        };
        let err = pipeline.apply(broken).unwrap_err();
        assert!(err.to_string().contains("requires 16"));
    }

    #[test]
    fn test_steps_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Steps {
            steps: Vec<AugmentStep>,
        }
        let parsed: Steps = toml::from_str(
            r#"
            [[steps]]
            op = "resize"
            height = 32
            width = 32

            [[steps]]
            op = "random_gamma"
            low = 90
            high = 110
            p = 0.25
            "#,
        )
        .unwrap();
        assert_eq!(
            parsed.steps,
            vec![
                AugmentStep::Resize {
                    height: 32,
                    width: 32
                },
                AugmentStep::RandomGamma {
                    low: 90,
                    high: 110,
                    p: 0.25
                },
            ]
        );
    }
}
