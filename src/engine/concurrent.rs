//! engine::concurrent
//!
//! Bounded-parallelism map and for-each with fail-fast cancellation.
//!
//! # Design
//!
//! Every item becomes one future; all of them are driven together with
//! `join_all` and gated by a semaphore so at most `limit` run at once. Each
//! call derives a child of the caller's cancellation token:
//!
//! - the first failure is recorded and cancels the child token,
//! - futures still waiting for a permit see the cancellation and never start,
//! - futures already running finish normally,
//! - cancelling the caller's token stops the phase the same way.
//!
//! Results are collected into index-tagged slots, so output order always
//! matches input order regardless of completion order.
//!
//! # Example
//!
//! ```
//! use git_stack::engine::concurrent::{Cancelled, Executor};
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio_test::block_on(async {
//! let executor = Executor::new(2, CancellationToken::new());
//! let doubled = executor
//!     .map(vec![1, 2, 3], |n| async move { Ok::<_, Cancelled>(n * 2) })
//!     .await
//!     .unwrap();
//! assert_eq!(doubled, vec![2, 4, 6]);
//! # });
//! ```

use std::future::Future;
use std::sync::Mutex;

use futures::future::join_all;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// The work was cancelled before it completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Runs a batch of fallible async operations with bounded parallelism.
#[derive(Debug, Clone)]
pub struct Executor {
    limit: usize,
    cancel: CancellationToken,
}

impl Executor {
    /// Create an executor running at most `limit` operations at once.
    ///
    /// A limit of zero is treated as one.
    pub fn new(limit: usize, cancel: CancellationToken) -> Self {
        Self {
            limit: limit.max(1),
            cancel,
        }
    }

    /// Maximum number of operations in flight.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Apply `f` to every item, returning results in input order.
    ///
    /// # Errors
    ///
    /// The first error any operation returns. When nothing failed but the
    /// caller's token was cancelled before every item ran, [`Cancelled`]
    /// converted into `E`.
    pub async fn map<T, R, E, F, Fut>(&self, items: Vec<T>, f: F) -> Result<Vec<R>, E>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: From<Cancelled>,
    {
        let total = items.len();
        let phase = self.cancel.child_token();
        let semaphore = Semaphore::new(self.limit);
        let first_error: Mutex<Option<E>> = Mutex::new(None);

        let (f, phase_ref, semaphore, first_error_ref) = (&f, &phase, &semaphore, &first_error);
        let tasks = items.into_iter().enumerate().map(|(index, item)| async move {
            let _permit = tokio::select! {
                biased;
                _ = phase_ref.cancelled() => return (index, None),
                permit = semaphore.acquire() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return (index, None),
                },
            };
            if phase_ref.is_cancelled() {
                return (index, None);
            }

            match f(item).await {
                Ok(value) => (index, Some(value)),
                Err(err) => {
                    let mut slot = first_error_ref.lock().unwrap_or_else(|e| e.into_inner());
                    if slot.is_none() {
                        debug!(index, "operation failed, cancelling remaining work");
                        *slot = Some(err);
                    }
                    phase_ref.cancel();
                    (index, None)
                }
            }
        });

        let finished = join_all(tasks).await;

        if let Some(err) = first_error.into_inner().unwrap_or_else(|e| e.into_inner()) {
            return Err(err);
        }

        let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();
        for (index, value) in finished {
            slots[index] = value;
        }
        slots
            .into_iter()
            .collect::<Option<Vec<R>>>()
            .ok_or_else(|| Cancelled.into())
    }

    /// Apply `f` to every item for its side effects.
    ///
    /// # Errors
    ///
    /// Same as [`Executor::map`].
    pub async fn for_each<T, E, F, Fut>(&self, items: Vec<T>, f: F) -> Result<(), E>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: From<Cancelled>,
    {
        self.map(items, f).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, PartialEq, Eq)]
    enum TestError {
        Failed(u32),
        Cancelled,
    }

    impl From<Cancelled> for TestError {
        fn from(_: Cancelled) -> Self {
            TestError::Cancelled
        }
    }

    #[tokio::test]
    async fn map_preserves_input_order() {
        let executor = Executor::new(3, CancellationToken::new());
        // Later items finish first.
        let out = executor
            .map(vec![1u64, 2, 3], |n| async move {
                tokio::time::sleep(Duration::from_millis(30 - n * 10)).await;
                Ok::<_, TestError>(n * 2)
            })
            .await
            .unwrap();
        assert_eq!(out, vec![2, 4, 6]);
    }

    #[tokio::test]
    async fn map_of_nothing_is_empty() {
        let executor = Executor::new(4, CancellationToken::new());
        let out: Vec<u32> = executor
            .map(Vec::<u32>::new(), |n| async move { Ok::<_, TestError>(n) })
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn never_exceeds_limit() {
        let executor = Executor::new(2, CancellationToken::new());
        let running = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        executor
            .for_each((0..8).collect(), |_: u32| {
                let (running, peak) = (&running, &peak);
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, TestError>(())
                }
            })
            .await
            .unwrap();

        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn first_failure_stops_pending_work() {
        let executor = Executor::new(1, CancellationToken::new());
        let calls = AtomicUsize::new(0);

        let result = executor
            .for_each(vec![1, 2, 3, 4, 5], |n| {
                let calls = &calls;
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if n == 2 {
                        Err(TestError::Failed(n))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        assert_eq!(result, Err(TestError::Failed(2)));
        assert!(calls.load(Ordering::SeqCst) <= executor.limit() + 1);
    }

    #[tokio::test]
    async fn first_recorded_error_wins() {
        let executor = Executor::new(4, CancellationToken::new());
        let result = executor
            .map(vec![1u64, 2, 3], |n| async move {
                // Item 3 fails first.
                tokio::time::sleep(Duration::from_millis(40 - n * 10)).await;
                Err::<(), _>(TestError::Failed(n as u32))
            })
            .await;
        assert_eq!(result, Err(TestError::Failed(3)));
    }

    #[tokio::test]
    async fn cancelled_caller_runs_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let executor = Executor::new(2, cancel);
        let calls = AtomicUsize::new(0);

        let result = executor
            .map(vec![1, 2, 3], |n| {
                let calls = &calls;
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, TestError>(n)
                }
            })
            .await;

        assert_eq!(result, Err(TestError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancel_mid_flight_skips_the_rest() {
        let cancel = CancellationToken::new();
        let executor = Executor::new(1, cancel.clone());

        let result = executor
            .map(vec![1, 2, 3], |n| {
                let cancel = cancel.clone();
                async move {
                    if n == 1 {
                        cancel.cancel();
                    }
                    Ok::<_, TestError>(n)
                }
            })
            .await;

        assert_eq!(result, Err(TestError::Cancelled));
    }

    #[test]
    fn zero_limit_is_clamped() {
        assert_eq!(Executor::new(0, CancellationToken::new()).limit(), 1);
    }
}
