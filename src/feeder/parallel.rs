//! Order-preserving parallel map.
//!
//! ```text
//! ┌────────────┐  (index, input)   ┌────────────┐  (index, output)  ┌──────────────┐
//! │ dispatcher │ ───────────────▶  │ worker 0…N │ ───────────────▶  │ reorder      │──▶ sink
//! │ (caller)   │   job channel     │ (scoped)   │  result channel   │ buffer       │
//! └────────────┘                   └────────────┘                   └──────────────┘
//! ```
//!
//! The calling thread both dispatches and consumes. It only dispatches while
//! fewer than `max_in_flight` records are outstanding (dispatched but not yet
//! forwarded), so the reorder buffer never holds more than that many results
//! no matter how unevenly the workers finish.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, info, trace};

use crate::writer::RecordSink;

use super::cancel::CancellationToken;
use super::config::FeederConfig;
use super::error::FeedError;
use super::stats::FeedStats;
use super::transform::{Transform, TransformError};

enum WorkerFailure {
    Transform(TransformError),
    Panicked,
}

type WorkerResult<O> = Result<O, WorkerFailure>;

fn worker_loop<I, T>(
    worker_id: usize,
    transform: &T,
    jobs: Receiver<(u64, I)>,
    results: Sender<(u64, WorkerResult<T::Output>)>,
) where
    T: Transform<I>,
{
    debug!("Worker {} started", worker_id);
    for (index, input) in jobs {
        trace!("Worker {} processing record {}", worker_id, index);
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| transform.apply(input))) {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(WorkerFailure::Transform(e)),
            Err(_) => Err(WorkerFailure::Panicked),
        };
        // Consumer gone: the run was aborted
        if results.send((index, outcome)).is_err() {
            break;
        }
    }
    debug!("Worker {} finished", worker_id);
}

/// Transform records on a pool of scoped worker threads and forward the
/// results to `sink` in input order.
pub(super) fn feed_parallel<R, I, T, S>(
    records: R,
    transform: &T,
    sink: &mut S,
    config: &FeederConfig,
    cancel: Option<&CancellationToken>,
) -> Result<FeedStats, FeedError>
where
    R: IntoIterator<Item = I>,
    I: Send,
    T: Transform<I>,
    S: RecordSink<T::Output>,
{
    let start = Instant::now();
    let worker_count = config.worker_count.max(1);
    let max_in_flight = config.max_in_flight() as u64;

    let mut forwarded = 0u64;
    let mut cancelled = false;

    thread::scope(|scope| -> Result<(), FeedError> {
        let (job_tx, job_rx) = unbounded::<(u64, I)>();
        let (result_tx, result_rx) = unbounded::<(u64, WorkerResult<T::Output>)>();

        for worker_id in 0..worker_count {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            thread::Builder::new()
                .name(format!("feeder-worker-{}", worker_id))
                .spawn_scoped(scope, move || worker_loop(worker_id, transform, jobs, results))
                .map_err(FeedError::Spawn)?;
        }
        // Workers hold the only job receivers and result senders from here on
        drop(job_rx);
        drop(result_tx);

        let mut inputs = records.into_iter();
        let mut exhausted = false;
        let mut dispatched = 0u64;
        let mut reorder: BTreeMap<u64, WorkerResult<T::Output>> = BTreeMap::new();

        loop {
            if !exhausted && cancel.is_some_and(|token| token.is_cancelled()) {
                info!(
                    "Cancellation requested after dispatching {} records, draining {} in flight",
                    dispatched,
                    dispatched - forwarded
                );
                cancelled = true;
                exhausted = true;
            }

            while !exhausted && dispatched - forwarded < max_in_flight {
                match inputs.next() {
                    Some(input) => {
                        job_tx
                            .send((dispatched, input))
                            .map_err(|_| FeedError::Disconnected)?;
                        dispatched += 1;
                    }
                    None => exhausted = true,
                }
            }

            if forwarded == dispatched {
                break;
            }

            let (index, result) = result_rx.recv().map_err(|_| FeedError::Disconnected)?;
            reorder.insert(index, result);

            while let Some(result) = reorder.remove(&forwarded) {
                match result {
                    Ok(output) => {
                        sink.add(output)?;
                        trace!("Forwarded record {}", forwarded);
                        forwarded += 1;
                    }
                    Err(WorkerFailure::Transform(source)) => {
                        return Err(FeedError::Transform {
                            index: forwarded,
                            source,
                        });
                    }
                    Err(WorkerFailure::Panicked) => {
                        return Err(FeedError::WorkerPanicked { index: forwarded });
                    }
                }
            }
        }
        Ok(())
    })?;

    let stats = FeedStats {
        records_forwarded: forwarded,
        workers: worker_count,
        elapsed: start.elapsed(),
        cancelled,
    };
    info!("Parallel feed: {}", stats);
    Ok(stats)
}
