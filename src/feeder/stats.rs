use std::fmt;
use std::time::Duration;

/// Statistics from one feeder run
#[derive(Debug, Clone, Default)]
pub struct FeedStats {
    /// Records forwarded to the sink
    pub records_forwarded: u64,
    /// Worker threads used (1 for the sequential path)
    pub workers: usize,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
    /// Whether the run stopped early on a cancellation request
    pub cancelled: bool,
}

impl FeedStats {
    /// Records per second over the whole run
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.records_forwarded as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for FeedStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Forwarded {} records with {} worker(s) in {:.3}s ({:.1} records/s)",
            self.records_forwarded,
            self.workers,
            self.elapsed.as_secs_f64(),
            self.throughput()
        )?;
        if self.cancelled {
            write!(f, " [cancelled]")?;
        }
        Ok(())
    }
}
