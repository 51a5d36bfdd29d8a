/// Configuration for the transform feeder
#[derive(Debug, Clone)]
pub struct FeederConfig {
    /// Number of worker threads for the parallel path
    pub worker_count: usize,

    /// Records allowed in flight per worker (dispatched but not yet
    /// forwarded). Bounds memory held by completed-but-unconsumed results.
    pub in_flight_per_worker: usize,
}

impl Default for FeederConfig {
    fn default() -> Self {
        Self {
            worker_count: std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(1),
            in_flight_per_worker: 2,
        }
    }
}

impl FeederConfig {
    /// Default configuration with an explicit worker count
    pub fn with_workers(worker_count: usize) -> Self {
        Self {
            worker_count,
            ..Self::default()
        }
    }

    /// Maximum records in flight at once, never less than one per worker
    pub fn max_in_flight(&self) -> usize {
        self.worker_count.max(1) * self.in_flight_per_worker.max(1)
    }
}
