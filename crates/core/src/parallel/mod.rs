use std::{
    ops::Range,
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

use rayon::ThreadPoolBuilder;

use crate::{
    classify::classify_row, progress::REDRAW_CADENCE_ROWS, CancelToken, ProgressCounter,
    ProgressSink, Raster, SegmentConfig,
};

/// Upper bound on waiting for the worker pool to wind down after a run.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(60);
/// Poll interval while draining, so cancellation is noticed promptly.
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Shared read-only state borrowed by every task of one parallel run.
struct LeafContext<'a> {
    source: &'a Raster,
    config: &'a SegmentConfig,
    leaf_rows: usize,
    progress: Option<&'a dyn ProgressSink>,
    counter: &'a ProgressCounter,
    cancel: &'a CancelToken,
}

/// Fork-join engine over the full row range [0, height).
///
/// The row range is bisected recursively down to a leaf threshold and the
/// leaves run concurrently on a work-stealing pool private to this call.
/// Sibling tasks never write overlapping rows: the destination byte slice
/// is split at the same midpoint as the range, so disjointness is enforced
/// by construction and only the progress counter needs atomic access.
///
/// Every tenth globally processed row triggers a redraw request on the
/// sink (if one is attached) followed by the configured pacing delay. The
/// delay follows the cadence whether or not a sink is present, keeping the
/// timing behaviour of headless runs representative; benchmark callers are
/// expected to pass a zero delay instead.
///
/// The caller-supplied counter is the only completeness report: after an
/// uncancelled run it equals the image height exactly.
pub fn segment(
    source: &Raster,
    destination: &mut Raster,
    config: &SegmentConfig,
    parallelism: usize,
    progress: Option<&dyn ProgressSink>,
    counter: &ProgressCounter,
    cancel: &CancelToken,
) {
    debug_assert_eq!(
        (source.width(), source.height(), source.channels()),
        (destination.width(), destination.height(), destination.channels()),
        "source and destination rasters must share dimensions",
    );

    let height = source.height();
    if height == 0 {
        return;
    }

    let workers = parallelism.max(1);
    let ctx = LeafContext {
        source,
        config,
        leaf_rows: leaf_rows(height, workers),
        progress,
        counter,
        cancel,
    };

    match ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => {
            pool.install(|| process_range(&ctx, 0..height, destination.as_bytes_mut()));
            drain(pool, cancel);
        }
        Err(err) => {
            tracing::warn!(%err, "worker pool could not be built, processing on the calling thread");
            process_leaf(&ctx, 0..height, destination.as_bytes_mut());
        }
    }
}

/// Row count below which a range is processed directly instead of split
/// further. Bounds task-creation overhead while leaving enough leaves to
/// balance load across the workers.
fn leaf_rows(height: usize, parallelism: usize) -> usize {
    (height / (parallelism * 4)).max(10)
}

/// Recursive bisection. The two halves partition the parent range exactly
/// and run with no ordering between them; the join blocks until both
/// complete.
fn process_range(ctx: &LeafContext<'_>, rows: Range<usize>, dst: &mut [u8]) {
    if rows.len() <= ctx.leaf_rows {
        process_leaf(ctx, rows, dst);
        return;
    }

    let mid = rows.start + rows.len() / 2;
    let (lower, upper) = dst.split_at_mut((mid - rows.start) * ctx.source.row_bytes());
    rayon::join(
        || process_range(ctx, rows.start..mid, lower),
        || process_range(ctx, mid..rows.end, upper),
    );
}

/// Processes the rows of one leaf range, identical per-row to the
/// sequential engine, then publishes each completed row to the shared
/// counter and services the global redraw cadence.
fn process_leaf(ctx: &LeafContext<'_>, rows: Range<usize>, dst: &mut [u8]) {
    let row_bytes = ctx.source.row_bytes();

    for (offset, y) in rows.enumerate() {
        let row = &mut dst[offset * row_bytes..(offset + 1) * row_bytes];
        classify_row(ctx.source, y, row, ctx.config.mode, ctx.config.threshold);

        let processed = ctx.counter.increment();
        if processed % REDRAW_CADENCE_ROWS != 0 {
            continue;
        }

        if let Some(sink) = ctx.progress {
            sink.redraw();
        }
        if !ctx.config.delay.is_zero() && !ctx.cancel.sleep(ctx.config.delay) {
            tracing::debug!(row = y, "leaf task cancelled during its pacing delay");
            return;
        }
    }
}

/// Waits for the pool's workers to wind down, bounded by [`DRAIN_TIMEOUT`].
/// A timeout, like a cancellation observed mid-wait, is a logged
/// degradation rather than a failure: the caller still returns normally
/// and leaf work already on a worker finishes cooperatively.
fn drain(pool: rayon::ThreadPool, cancel: &CancelToken) {
    let (done_tx, done_rx) = mpsc::channel();
    thread::spawn(move || {
        drop(pool);
        let _ = done_tx.send(());
    });

    let deadline = Instant::now() + DRAIN_TIMEOUT;
    loop {
        match done_rx.recv_timeout(DRAIN_POLL) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
            Err(RecvTimeoutError::Timeout) => {
                if cancel.is_cancelled() {
                    tracing::warn!("cancelled while waiting for the worker pool to drain");
                    return;
                }
                if Instant::now() >= deadline {
                    tracing::warn!(timeout = ?DRAIN_TIMEOUT, "worker pool did not drain in time");
                    return;
                }
            }
        }
    }
}
