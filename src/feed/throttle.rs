// SPDX-License-Identifier: MPL-2.0

//! Admission control for relay and backend requests.
//!
//! A [`RequestQueue`] owns a bounded channel and a fixed pool of workers.
//! Jobs are admitted in submission order and at most `max_concurrent` run at
//! once; completion order is whatever the network gives us. A job that fails
//! or panics is logged and reported to its submitter, and the worker moves on
//! to the next job.
//!
//! There is no priority, cancellation or timeout: a job that never finishes
//! holds its worker for good.

use crate::config::{MAX_CONCURRENT_REQUESTS, REQUEST_QUEUE_DEPTH};
use futures::future::BoxFuture;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::{Mutex, mpsc, oneshot};

#[derive(Error, Debug)]
pub enum ThrottleError<E> {
    #[error("request failed: {0}")]
    Failed(E),
    #[error("request panicked")]
    Panicked,
    #[error("request queue closed")]
    Closed,
}

type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Pending result of a submitted job.
pub struct RequestHandle<T, E> {
    rx: Option<oneshot::Receiver<Result<T, E>>>,
}

impl<T, E> RequestHandle<T, E> {
    /// Wait for the job to finish.
    pub async fn wait(self) -> Result<T, ThrottleError<E>> {
        let Some(rx) = self.rx else {
            return Err(ThrottleError::Closed);
        };
        match rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ThrottleError::Failed(e)),
            // sender dropped without a result: the job panicked
            Err(_) => Err(ThrottleError::Panicked),
        }
    }
}

/// Bounded FIFO queue drained by a fixed number of workers.
///
/// Must be created inside a Tokio runtime; the workers stop once the queue
/// is dropped and the remaining jobs have run.
pub struct RequestQueue {
    sender: mpsc::Sender<Job>,
    in_flight: Arc<AtomicUsize>,
    max_concurrent: usize,
}

impl RequestQueue {
    pub fn new(max_concurrent: usize) -> Self {
        Self::with_depth(max_concurrent, REQUEST_QUEUE_DEPTH)
    }

    pub fn with_depth(max_concurrent: usize, depth: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        let (sender, receiver) = mpsc::channel::<Job>(depth.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let in_flight = Arc::new(AtomicUsize::new(0));

        for worker in 0..max_concurrent {
            let receiver = Arc::clone(&receiver);
            let in_flight = Arc::clone(&in_flight);
            tokio::spawn(async move {
                loop {
                    // Mutex is fair, so idle workers take jobs in turn.
                    let job = receiver.lock().await.recv().await;
                    let Some(job) = job else {
                        break;
                    };

                    in_flight.fetch_add(1, Ordering::SeqCst);
                    let outcome = tokio::spawn(job()).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);

                    if let Err(e) = outcome {
                        tracing::warn!(worker, "throttled request panicked: {}", e);
                    }
                }
                tracing::debug!(worker, "request worker stopped");
            });
        }

        Self {
            sender,
            in_flight,
            max_concurrent,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Jobs currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Queue a job. Waits only while the queue is full; the returned handle
    /// resolves when the job itself finishes.
    pub async fn submit<F, Fut, T, E>(&self, op: F) -> RequestHandle<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            Box::pin(async move {
                let result = op().await;
                if let Err(e) = &result {
                    tracing::warn!("throttled request failed: {}", e);
                }
                // submitter may have stopped waiting
                let _ = tx.send(result);
            })
        });

        match self.sender.send(job).await {
            Ok(()) => RequestHandle { rx: Some(rx) },
            Err(_) => RequestHandle { rx: None },
        }
    }

    /// Submit and wait for the result.
    pub async fn run<F, Fut, T, E>(&self, op: F) -> Result<T, ThrottleError<E>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        self.submit(op).await.wait().await
    }
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new(MAX_CONCURRENT_REQUESTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_never_exceeds_cap() {
        let queue = RequestQueue::new(MAX_CONCURRENT_REQUESTS);
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            let completed = Arc::clone(&completed);
            let handle = queue
                .submit(move || async move {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                    completed.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(())
                })
                .await;
            handles.push(handle);
        }

        for handle in handles {
            handle.wait().await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), MAX_CONCURRENT_REQUESTS);
        assert_eq!(completed.load(Ordering::SeqCst), 20);
        assert_eq!(queue.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_admission_is_fifo() {
        let queue = RequestQueue::new(1);
        let started = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..10 {
            let started = Arc::clone(&started);
            handles.push(
                queue
                    .submit(move || async move {
                        started.lock().unwrap().push(i);
                        tokio::task::yield_now().await;
                        Ok::<_, String>(i)
                    })
                    .await,
            );
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.wait().await.unwrap());
        }

        assert_eq!(*started.lock().unwrap(), (0..10).collect::<Vec<_>>());
        assert_eq!(results, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_failure_does_not_block_queue() {
        let queue = RequestQueue::new(1);

        let failing = queue
            .submit(|| async { Err::<u32, _>("relay unreachable".to_string()) })
            .await;
        let next = queue.submit(|| async { Ok::<_, String>(7) }).await;

        assert!(matches!(failing.wait().await, Err(ThrottleError::Failed(e)) if e == "relay unreachable"));
        assert_eq!(next.wait().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let queue = RequestQueue::new(1);

        let panicking = queue
            .submit(|| async {
                if true {
                    panic!("boom");
                }
                Ok::<u32, String>(0)
            })
            .await;
        let next = queue.run(|| async { Ok::<_, String>(1) }).await;

        assert!(matches!(panicking.wait().await, Err(ThrottleError::Panicked)));
        assert_eq!(next.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_every_job_runs_once() {
        let queue = RequestQueue::with_depth(3, 2);
        let runs = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..25 {
            let runs = Arc::clone(&runs);
            handles.push(
                queue
                    .submit(move || async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, String>(())
                    })
                    .await,
            );
        }
        for handle in handles {
            handle.wait().await.unwrap();
        }

        assert_eq!(runs.load(Ordering::SeqCst), 25);
        assert_eq!(queue.max_concurrent(), 3);
    }
}
