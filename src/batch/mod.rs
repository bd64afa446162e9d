//! Batch Orchestrator (C7): a reusable bounded-concurrency worker pool
//! with progress, error accounting, and cooperative cancellation. Drives
//! Embed-all, Faces-all, Reconcile-all, and Era-compute.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::common::errors::CoreError;

/// Aggregated result of a pool run: success/error counts and the
/// messages behind each error, collected under a single mutex.
#[derive(Debug, Default, Clone)]
pub struct BatchOutcome {
    pub successes: usize,
    pub errors: usize,
    pub error_messages: Vec<String>,
    pub cancelled: bool,
}

/// Runs `worker` over every item in `items` with at most `concurrency`
/// in flight at once. Every item is dispatched at most once; on
/// cancellation, no new items are dispatched but in-flight ones run to
/// completion before this returns.
pub async fn run_pool<T, F, Fut>(
    items: Vec<T>,
    concurrency: usize,
    cancel: CancellationToken,
    worker: F,
) -> BatchOutcome
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CoreError>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let worker = Arc::new(worker);
    let successes = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(AtomicUsize::new(0));
    let error_messages = Arc::new(Mutex::new(Vec::new()));
    let mut dispatched_cancelled = false;

    let mut tasks = JoinSet::new();
    for item in items {
        if cancel.is_cancelled() {
            dispatched_cancelled = true;
            break;
        }
        let permit = Arc::clone(&semaphore);
        let worker = Arc::clone(&worker);
        let successes = Arc::clone(&successes);
        let errors = Arc::clone(&errors);
        let error_messages = Arc::clone(&error_messages);
        let cancel = cancel.clone();

        tasks.spawn(async move {
            let _permit = permit.acquire_owned().await.expect("semaphore not closed");
            if cancel.is_cancelled() {
                return;
            }
            match worker(item).await {
                Ok(()) => {
                    successes.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    errors.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %e, "batch item failed");
                    error_messages.lock().await.push(e.to_string());
                }
            }
        });
    }

    while tasks.join_next().await.is_some() {}

    BatchOutcome {
        successes: successes.load(Ordering::Relaxed),
        errors: errors.load(Ordering::Relaxed),
        error_messages: Arc::try_unwrap(error_messages)
            .map(Mutex::into_inner)
            .unwrap_or_default(),
        cancelled: dispatched_cancelled || cancel.is_cancelled(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_every_item_at_most_once() {
        let items = vec![1, 2, 3, 4, 5];
        let outcome = run_pool(items, 2, CancellationToken::new(), |n| async move {
            if n == 3 {
                Err(CoreError::Invalid("boom".into()))
            } else {
                Ok(())
            }
        })
        .await;
        assert_eq!(outcome.successes, 4);
        assert_eq!(outcome.errors, 1);
        assert_eq!(outcome.error_messages.len(), 1);
        assert!(!outcome.cancelled);
    }

    #[tokio::test]
    async fn pre_cancelled_token_dispatches_nothing_new() {
        let token = CancellationToken::new();
        token.cancel();
        let outcome = run_pool(vec![1, 2, 3], 2, token, |_| async { Ok(()) }).await;
        assert_eq!(outcome.successes, 0);
        assert!(outcome.cancelled);
    }
}
