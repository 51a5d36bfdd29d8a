//! # Samples and Sample Sources
//!
//! A sample is one image with one class label. [`RawSample`] is what a
//! [`SampleSource`] produces (8-bit pixels, height × width × channels,
//! row-major), [`ProcessedSample`] is what a transform hands to the store
//! (`f32` pixels, same label).
//!
//! [`SyntheticDigits`] stands in for a real dataset: MNIST-shaped samples
//! generated deterministically from their index.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::writer::Record;

/// Image dimensions as (height, width, channels)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageShape {
    /// Rows
    pub height: usize,
    /// Columns
    pub width: usize,
    /// Channels per pixel
    pub channels: usize,
}

impl ImageShape {
    /// Create a shape
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }

    /// Number of values in one image
    pub fn len(&self) -> usize {
        self.height * self.width * self.channels
    }

    /// Returns true if any dimension is zero
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Same shape with a different spatial size
    pub fn with_size(&self, height: usize, width: usize) -> Self {
        Self::new(height, width, self.channels)
    }

    /// Shape as a record shape for a store field
    pub fn to_array(&self) -> [usize; 3] {
        [self.height, self.width, self.channels]
    }
}

impl Default for ImageShape {
    fn default() -> Self {
        Self::new(28, 28, 1)
    }
}

impl fmt::Display for ImageShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.height, self.width, self.channels)
    }
}

impl FromStr for ImageShape {
    type Err = String;

    /// Parses `HxW` (one channel) or `HxWxC`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dims = s
            .split(['x', 'X'])
            .map(|part| part.trim().parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid shape '{}': {}", s, e))?;

        let shape = match dims.as_slice() {
            [h, w] => Self::new(*h, *w, 1),
            [h, w, c] => Self::new(*h, *w, *c),
            _ => return Err(format!("invalid shape '{}': expected HxW or HxWxC", s)),
        };
        if shape.is_empty() {
            return Err(format!("invalid shape '{}': dimensions must be non-zero", s));
        }
        Ok(shape)
    }
}

/// An unprocessed image and its label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSample {
    /// Row-major pixels, `shape.len()` values
    pub pixels: Vec<u8>,
    /// Image dimensions
    pub shape: ImageShape,
    /// Class label
    pub label: u8,
    /// Position of the sample in its source
    pub index: u64,
}

/// A transformed image and its (unchanged) label
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedSample {
    /// Row-major pixels, `shape.len()` values
    pub pixels: Vec<f32>,
    /// Image dimensions after the transform
    pub shape: ImageShape,
    /// Class label
    pub label: u8,
}

impl ProcessedSample {
    /// Convert into a store record with the image under `image_key` and the
    /// label under `label_key`.
    pub fn into_record(self, image_key: &str, label_key: &str) -> Record {
        Record::new()
            .with(image_key, self.pixels)
            .with(label_key, self.label)
    }
}

impl From<RawSample> for ProcessedSample {
    fn from(raw: RawSample) -> Self {
        Self {
            pixels: raw.pixels.into_iter().map(f32::from).collect(),
            shape: raw.shape,
            label: raw.label,
        }
    }
}

/// Indexed collection of samples of one fixed shape.
pub trait SampleSource: Sync {
    /// Shape shared by every sample
    fn sample_shape(&self) -> ImageShape;

    /// Number of samples
    fn len(&self) -> usize;

    /// Returns true if the source holds no samples
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load sample `index`, or `None` past the end
    fn load(&self, index: usize) -> Option<RawSample>;

    /// Iterate over every sample in index order
    fn samples(&self) -> Samples<'_, Self>
    where
        Self: Sized,
    {
        Samples {
            source: self,
            next: 0,
        }
    }
}

/// Iterator returned by [`SampleSource::samples`]
#[derive(Debug)]
pub struct Samples<'a, S> {
    source: &'a S,
    next: usize,
}

impl<S: SampleSource> Iterator for Samples<'_, S> {
    type Item = RawSample;

    fn next(&mut self) -> Option<RawSample> {
        let sample = self.source.load(self.next)?;
        self.next += 1;
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.source.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

/// Deterministic MNIST-shaped synthetic samples.
///
/// Sample `i` has label `i % 10` and a stroke pattern that depends on the
/// label, with per-sample noise drawn from an RNG seeded by `seed` and `i`.
#[derive(Debug, Clone)]
pub struct SyntheticDigits {
    count: usize,
    shape: ImageShape,
    seed: u64,
}

impl SyntheticDigits {
    /// `count` samples of 28×28×1
    pub fn new(count: usize) -> Self {
        Self {
            count,
            shape: ImageShape::default(),
            seed: 0,
        }
    }

    /// Use a different image shape
    pub fn with_shape(mut self, shape: ImageShape) -> Self {
        self.shape = shape;
        self
    }

    /// Use a different noise seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn render(&self, index: usize, label: u8) -> Vec<u8> {
        let mut rng = StdRng::seed_from_u64(self.seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        let ImageShape {
            height,
            width,
            channels,
        } = self.shape;
        let stride = usize::from(label) + 3;

        let mut pixels = Vec::with_capacity(self.shape.len());
        for y in 0..height {
            for x in 0..width {
                let on_stroke = (x + y * usize::from(label)) % stride < 2;
                for _ in 0..channels {
                    let value = if on_stroke {
                        rng.random_range(200..=255)
                    } else {
                        rng.random_range(0..32)
                    };
                    pixels.push(value);
                }
            }
        }
        pixels
    }
}

impl SampleSource for SyntheticDigits {
    fn sample_shape(&self) -> ImageShape {
        self.shape
    }

    fn len(&self) -> usize {
        self.count
    }

    fn load(&self, index: usize) -> Option<RawSample> {
        if index >= self.count {
            return None;
        }
        let label = (index % 10) as u8;
        Some(RawSample {
            pixels: self.render(index, label),
            shape: self.shape,
            label,
            index: index as u64,
        })
    }
}
