use std::time::Instant;

use log::{info, trace};

use crate::writer::RecordSink;

use super::cancel::CancellationToken;
use super::error::FeedError;
use super::stats::FeedStats;
use super::transform::Transform;

/// Transform and forward records one at a time on the calling thread.
pub(super) fn feed_sequential<R, I, T, S>(
    records: R,
    transform: &T,
    sink: &mut S,
    cancel: Option<&CancellationToken>,
) -> Result<FeedStats, FeedError>
where
    R: IntoIterator<Item = I>,
    T: Transform<I>,
    S: RecordSink<T::Output>,
{
    let start = Instant::now();
    let mut forwarded = 0u64;
    let mut cancelled = false;

    for (index, input) in records.into_iter().enumerate() {
        if cancel.is_some_and(|token| token.is_cancelled()) {
            info!("Cancellation requested after {} records", forwarded);
            cancelled = true;
            break;
        }

        let index = index as u64;
        let output = transform
            .apply(input)
            .map_err(|source| FeedError::Transform { index, source })?;
        sink.add(output)?;
        forwarded += 1;
        trace!("Forwarded record {}", index);
    }

    let stats = FeedStats {
        records_forwarded: forwarded,
        workers: 1,
        elapsed: start.elapsed(),
        cancelled,
    };
    info!("Sequential feed: {}", stats);
    Ok(stats)
}
