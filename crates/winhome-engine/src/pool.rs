//! Bounded fan-out over scoped threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// Runs `work` once per item on at most `max_workers` threads and returns
/// when every item is done. Completion order is unspecified.
pub fn fan_out<T, F>(items: &[T], max_workers: usize, work: F)
where
    T: Sync,
    F: Fn(&T) + Sync,
{
    let workers = max_workers.clamp(1, items.len().max(1));
    if workers == 1 {
        items.iter().for_each(work);
        return;
    }

    let next = AtomicUsize::new(0);
    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                while let Some(item) = items.get(next.fetch_add(1, Ordering::Relaxed)) {
                    work(item);
                }
            });
        }
    });
}
