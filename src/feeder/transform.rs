/// Error type returned by transforms.
///
/// Transforms are external collaborators, so their failures are carried as
/// opaque boxed errors.
pub type TransformError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A per-record processing step run by the feeder's workers.
///
/// Implementations must be callable from several worker threads at once.
/// Each call is independent; any randomness (and its seeding) is the
/// transform's own concern.
///
/// Closures implement this trait directly:
///
/// ```rust
/// use samplestore::feeder::{Transform, TransformError};
///
/// let double = |x: u32| -> Result<u32, TransformError> { Ok(x * 2) };
/// assert_eq!(double.apply(21).unwrap(), 42);
/// ```
pub trait Transform<I>: Sync {
    /// Transformed record type
    type Output: Send;

    /// Transform one record
    fn apply(&self, input: I) -> Result<Self::Output, TransformError>;
}

impl<I, O, F> Transform<I> for F
where
    F: Fn(I) -> Result<O, TransformError> + Sync,
    O: Send,
{
    type Output = O;

    fn apply(&self, input: I) -> Result<O, TransformError> {
        self(input)
    }
}
