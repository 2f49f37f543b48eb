//! Helpers for racing operations across threads.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

/// Outcome of a [`race`].
#[derive(Debug)]
pub struct RaceResult<R> {
    /// Per-thread results, in thread order.
    pub results: Vec<R>,
    /// Wall time from release to the last thread finishing.
    pub duration: Duration,
}

impl<T, E> RaceResult<Result<T, E>> {
    /// Number of threads that succeeded.
    pub fn successes(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    /// Number of threads that failed.
    pub fn failures(&self) -> usize {
        self.results.len() - self.successes()
    }
}

/// Runs `op` on `threads` threads released together by a barrier.
///
/// Each call receives its thread index.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn race<F, R>(threads: usize, op: F) -> RaceResult<R>
where
    F: Fn(usize) -> R + Send + Sync + 'static,
    R: Send + 'static,
{
    let op = Arc::new(op);
    let barrier = Arc::new(Barrier::new(threads + 1));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let op = Arc::clone(&op);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                op(i)
            })
        })
        .collect();

    barrier.wait();
    let start = Instant::now();
    let results = handles
        .into_iter()
        .map(|h| h.join().expect("race worker panicked"))
        .collect();

    RaceResult {
        results,
        duration: start.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn every_thread_runs_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let result = race(6, move |i| {
            counter.fetch_add(1, Ordering::SeqCst);
            i
        });
        assert_eq!(hits.load(Ordering::SeqCst), 6);
        assert_eq!(result.results, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn counts_outcomes() {
        let result = race(4, |i| if i % 2 == 0 { Ok(i) } else { Err(i) });
        assert_eq!(result.successes(), 2);
        assert_eq!(result.failures(), 2);
    }
}
