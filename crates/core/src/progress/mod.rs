use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

/// Number of globally processed rows between redraw requests in the
/// parallel engine. Fixed rather than configurable; the cadence balances
/// redraw frequency against notification overhead.
pub const REDRAW_CADENCE_ROWS: usize = 10;

/// Receiver of payload-free "some rows are ready, redraw if you wish"
/// notifications. Implementations must be callable from any worker thread.
pub trait ProgressSink: Sync {
    fn redraw(&self);
}

impl<F: Fn() + Sync> ProgressSink for F {
    fn redraw(&self) {
        self()
    }
}

/// Shared count of fully processed rows, visible to every leaf task of one
/// parallel run. Created fresh per invocation; after an uncancelled run the
/// value equals the image height exactly, which is also how callers detect
/// an incomplete (cancelled) run.
#[derive(Debug, Default)]
pub struct ProgressCounter {
    rows: AtomicUsize,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically records one more completed row and returns the global
    /// count including it. `fetch_add` hands every caller a distinct count,
    /// so no row is double-counted and none skipped.
    pub fn increment(&self) -> usize {
        self.rows.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn value(&self) -> usize {
        self.rows.load(Ordering::Relaxed)
    }
}

/// Cooperative cancellation context threaded through each engine call.
///
/// Clones share one flag. Engines poll the token at their suspension
/// points only; work between suspension points always runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Sleeps for `duration`, waking early when the token fires. Returns
    /// `false` if the sleep was cut short by cancellation.
    pub fn sleep(&self, duration: Duration) -> bool {
        const SLICE: Duration = Duration::from_millis(5);

        let deadline = Instant::now() + duration;
        while !self.is_cancelled() {
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(SLICE));
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_rows_exactly_across_threads() {
        let counter = ProgressCounter::new();

        thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..25 {
                        counter.increment();
                    }
                });
            }
        });

        assert_eq!(counter.value(), 100);
    }

    #[test]
    fn increment_returns_the_count_including_itself() {
        let counter = ProgressCounter::new();
        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.increment(), 2);
        assert_eq!(counter.value(), 2);
    }

    #[test]
    fn uncancelled_sleep_runs_to_completion() {
        let token = CancelToken::new();
        assert!(token.sleep(Duration::from_millis(1)));
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancellation_cuts_a_sleep_short() {
        let token = CancelToken::new();
        let remote = token.clone();

        let start = Instant::now();
        let waker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        assert!(!token.sleep(Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(1));
        waker.join().unwrap();
    }

    #[test]
    fn an_already_fired_token_skips_the_sleep_entirely() {
        let token = CancelToken::new();
        token.cancel();
        assert!(!token.sleep(Duration::from_secs(5)));
    }
}
