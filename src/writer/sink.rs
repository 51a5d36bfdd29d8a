use super::error::StoreError;

/// Destination for records produced by the feeder.
///
/// The feeder only ever appends; record identity is the order of `add`
/// calls, so implementations must keep that order.
pub trait RecordSink<T> {
    /// Append one item
    fn add(&mut self, item: T) -> Result<(), StoreError>;
}

/// In-memory sink, mainly useful for tests and dry runs.
impl<T> RecordSink<T> for Vec<T> {
    fn add(&mut self, item: T) -> Result<(), StoreError> {
        self.push(item);
        Ok(())
    }
}
