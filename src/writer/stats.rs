use std::fmt;

/// Statistics from a store session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of records committed to the backing arrays
    pub records_written: u64,
    /// Number of non-empty flushes performed
    pub flushes: usize,
    /// Size of the largest flush, in records
    pub largest_flush: usize,
    /// Total payload bytes written to field regions
    pub bytes_written: u64,
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Wrote {} records ({} bytes) in {} flushes",
            self.records_written, self.bytes_written, self.flushes
        )
    }
}
