//! # Store Schema Definition
//!
//! This module defines how a store is laid out: the element types it
//! supports ([`DType`]), the declaration of a named field ([`FieldSpec`]) and
//! the manifest written to the head of every store file ([`StoreManifest`]).
//!
//! ## Layout
//!
//! Fields are stored field-major: each field owns one contiguous region of
//! `capacity × record_bytes` bytes. Record `i` of every field lives at the
//! same index `i`, which is the only cross-field consistency guarantee a
//! store offers.
//!
//! ## Default Fields
//!
//! | Field | Type | Record shape |
//! |-------|------|--------------|
//! | images | f32 | (height, width, channels) |
//! | labels | u8 | scalar |

mod constants;
mod dtype;
mod field;
pub mod manifest;


pub use constants::*;
pub use dtype::DType;
pub use field::FieldSpec;
pub use manifest::{FieldLayout, ManifestError, StoreManifest};

/// Default field declarations: an `f32` image field of `image_shape` and a
/// scalar `u8` label field.
pub fn image_label_fields(
    image_key: &str,
    label_key: &str,
    image_shape: [usize; 3],
) -> Vec<FieldSpec> {
    vec![
        FieldSpec::new(image_key, DType::F32, image_shape.to_vec()),
        FieldSpec::scalar(label_key, DType::U8),
    ]
}
