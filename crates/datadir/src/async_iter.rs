//! Background-parallel mapping of resources during load.
//!
//! The iterator decouples producing parsed entities from consuming them: a
//! producer thread fans the input out over a rayon pool, mapped results flow
//! through a bounded channel, and the consumer just iterates. Items whose
//! mapping fails are logged and skipped so one corrupt file never aborts a
//! load. Completion is signalled by channel disconnect when the last worker
//! drops its sender, so no sentinel value is needed.
//!
//! Degenerate inputs spawn nothing: an empty input is exhausted up front,
//! and a single item (or a worker budget of one) is mapped synchronously on
//! the constructing thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::JoinHandle;

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{error, warn};

use crate::error::DataDirError;

/// Backpressure bound between the mapping pool and the consumer.
const QUEUE_CAPACITY: usize = 10_000;

enum Inner<T> {
    /// Everything already mapped on the constructing thread.
    Ready(std::vec::IntoIter<T>),
    Parallel {
        rx: Option<Receiver<T>>,
        producer: Option<JoinHandle<()>>,
        cancelled: Arc<AtomicBool>,
    },
}

pub struct AsyncResourceIterator<T> {
    inner: Inner<T>,
}

impl<T: Send + 'static> AsyncResourceIterator<T> {
    /// Map `items` with `mapper` across `threads` workers. `Ok(None)` drops
    /// the item silently, `Err` drops it with a warning.
    pub fn new<I, F>(items: Vec<I>, threads: usize, mapper: F) -> Self
    where
        I: Send + 'static,
        F: Fn(I) -> Result<Option<T>, DataDirError> + Send + Sync + 'static,
    {
        if items.len() <= 1 || threads <= 1 {
            let mapped: Vec<T> = items
                .into_iter()
                .filter_map(|item| apply(&mapper, item))
                .collect();
            return Self {
                inner: Inner::Ready(mapped.into_iter()),
            };
        }

        let (tx, rx) = mpsc::sync_channel::<T>(QUEUE_CAPACITY);
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();

        let producer = std::thread::Builder::new()
            .name("resource-iter".to_string())
            .spawn(move || {
                let pool = match rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("resource-iter-{i}"))
                    .build()
                {
                    Ok(pool) => pool,
                    Err(e) => {
                        error!("failed to build iterator pool: {e}");
                        return;
                    }
                };
                pool.install(|| {
                    items.into_par_iter().for_each_with(tx, |tx, item| {
                        if flag.load(Ordering::Relaxed) {
                            return;
                        }
                        if let Some(mapped) = apply(&mapper, item) {
                            // Send fails only after close() dropped the
                            // receiver; the value is discarded either way.
                            let _ = tx.send(mapped);
                        }
                    });
                });
            });

        match producer {
            Ok(handle) => Self {
                inner: Inner::Parallel {
                    rx: Some(rx),
                    producer: Some(handle),
                    cancelled,
                },
            },
            Err(e) => {
                error!("failed to spawn iterator producer, yielding nothing: {e}");
                Self {
                    inner: Inner::Ready(Vec::new().into_iter()),
                }
            }
        }
    }

    /// Stop early: flag the workers, drop the receiver so blocked senders
    /// unblock, and join the producer. Safe to call more than once; also
    /// runs on drop.
    pub fn close(&mut self) {
        if let Inner::Parallel {
            rx,
            producer,
            cancelled,
        } = &mut self.inner
        {
            cancelled.store(true, Ordering::Relaxed);
            rx.take();
            if let Some(handle) = producer.take() {
                if handle.join().is_err() {
                    error!("iterator producer thread panicked");
                }
            }
        }
    }
}

fn apply<I, T>(
    mapper: &impl Fn(I) -> Result<Option<T>, DataDirError>,
    item: I,
) -> Option<T> {
    match mapper(item) {
        Ok(mapped) => mapped,
        Err(e) => {
            warn!("skipping unreadable resource: {e}");
            None
        }
    }
}

impl<T> Iterator for AsyncResourceIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        match &mut self.inner {
            Inner::Ready(mapped) => mapped.next(),
            // recv() returns Err exactly when every sender is gone, i.e. the
            // producer finished (or close() ran).
            Inner::Parallel { rx, .. } => rx.as_ref()?.recv().ok(),
        }
    }
}

impl<T> Drop for AsyncResourceIterator<T> {
    fn drop(&mut self) {
        if let Inner::Parallel {
            rx,
            producer,
            cancelled,
        } = &mut self.inner
        {
            cancelled.store(true, Ordering::Relaxed);
            rx.take();
            if let Some(handle) = producer.take() {
                let _ = handle.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn yields_everything_in_parallel_mode() {
        let items: Vec<u32> = (0..1000).collect();
        let iter = AsyncResourceIterator::new(items, 4, |n| Ok(Some(n * 2)));
        let out: HashSet<u32> = iter.collect();
        assert_eq!(out.len(), 1000);
        assert!(out.contains(&0));
        assert!(out.contains(&1998));
    }

    #[test]
    fn failures_and_nones_are_skipped() {
        let items: Vec<u32> = (0..10).collect();
        let iter = AsyncResourceIterator::new(items, 2, |n| {
            if n % 3 == 0 {
                Err(DataDirError::Decrypt("bad".into()))
            } else if n % 3 == 1 {
                Ok(None)
            } else {
                Ok(Some(n))
            }
        });
        let mut out: Vec<u32> = iter.collect();
        out.sort_unstable();
        assert_eq!(out, vec![2, 5, 8]);
    }

    #[test]
    fn empty_input_spawns_nothing() {
        let mut iter = AsyncResourceIterator::new(Vec::<u32>::new(), 8, |n| Ok(Some(n)));
        assert!(matches!(iter.inner, Inner::Ready(_)));
        assert!(iter.next().is_none());
    }

    #[test]
    fn single_item_maps_on_constructing_thread() {
        let me = thread::current().id();
        let mut iter = AsyncResourceIterator::new(vec![7u32], 8, move |n| {
            Ok(Some((n, thread::current().id())))
        });
        assert!(matches!(iter.inner, Inner::Ready(_)));
        assert_eq!(iter.next(), Some((7, me)));
        assert!(iter.next().is_none());
    }

    #[test]
    fn single_worker_maps_on_constructing_thread() {
        let me = thread::current().id();
        for threads in [0, 1] {
            let iter = AsyncResourceIterator::new(vec![1u32, 2, 3], threads, move |n| {
                Ok(Some((n, thread::current().id())))
            });
            let out: Vec<_> = iter.collect();
            assert_eq!(out.len(), 3);
            assert!(out.iter().all(|(_, id)| *id == me));
        }
    }

    #[test]
    fn close_terminates_a_saturated_producer() {
        // Far more items than the queue holds, so workers block on send.
        let items: Vec<u32> = (0..100_000).collect();
        let mut iter = AsyncResourceIterator::new(items, 4, |n| Ok(Some(n)));
        assert!(iter.next().is_some());
        iter.close();
        assert!(iter.next().is_none());
        // second close is a no-op
        iter.close();
    }
}
