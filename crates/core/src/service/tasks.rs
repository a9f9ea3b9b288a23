//! Detached, bounded background work for cache maintenance.
//!
//! Jobs never block the request that scheduled them. Best-effort jobs are
//! dropped when every permit is taken; required jobs queue for a permit.
//! Each job runs under its own timeout, detached from the scheduling
//! request's lifetime.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, watch};

use crate::Error;

/// Runner for fire-and-forget cache jobs.
#[derive(Debug, Clone)]
pub struct BackgroundTasks {
    permits: Arc<Semaphore>,
    in_flight: Arc<watch::Sender<usize>>,
    timeout: Duration,
}

/// Decrements the in-flight count even if the job panics.
struct InFlightGuard(Arc<watch::Sender<usize>>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

async fn run<F>(label: &'static str, timeout: Duration, job: F)
where
    F: Future<Output = Result<(), Error>>,
{
    match tokio::time::timeout(timeout, job).await {
        Ok(Ok(())) => tracing::trace!(job = label, "cache job finished"),
        Ok(Err(e)) if e.is_cache() => tracing::warn!(job = label, error = %e, "cache job failed"),
        Ok(Err(e)) => tracing::error!(job = label, error = %e, "cache job failed outside the cache"),
        Err(_) => tracing::warn!(job = label, timeout_ms = timeout.as_millis() as u64, "cache job timed out"),
    }
}

impl BackgroundTasks {
    /// Allow at most `max_concurrent` jobs, each bounded by `timeout`.
    pub fn new(max_concurrent: usize, timeout: Duration) -> Self {
        let (in_flight, _) = watch::channel(0usize);
        Self { permits: Arc::new(Semaphore::new(max_concurrent.max(1))), in_flight: Arc::new(in_flight), timeout }
    }

    /// Schedule `job` if a permit is free. Returns `false` if it was
    /// dropped because the runner is at capacity.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, label: &'static str, job: F) -> bool
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let Ok(permit) = Arc::clone(&self.permits).try_acquire_owned() else {
            tracing::debug!(job = label, "background runner at capacity, cache job dropped");
            return false;
        };

        let guard = self.enter();
        let timeout = self.timeout;
        tokio::spawn(async move {
            let _guard = guard;
            let _permit = permit;
            run(label, timeout, job).await;
        });

        true
    }

    /// Schedule `job`, waiting for a permit inside the spawned task
    /// instead of dropping it. The timeout starts once the permit is held.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_required<F>(&self, label: &'static str, job: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let guard = self.enter();
        let permits = Arc::clone(&self.permits);
        let timeout = self.timeout;
        tokio::spawn(async move {
            let _guard = guard;
            // The semaphore is never closed.
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            run(label, timeout, job).await;
        });
    }

    fn enter(&self) -> InFlightGuard {
        self.in_flight.send_modify(|n| *n += 1);
        InFlightGuard(Arc::clone(&self.in_flight))
    }

    /// Number of jobs scheduled but not yet finished.
    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    /// Wait up to `grace` for every in-flight job to finish.
    ///
    /// Returns `false` if jobs were still running when the grace period
    /// ran out; those are abandoned.
    pub async fn drain(&self, grace: Duration) -> bool {
        let mut rx = self.in_flight.subscribe();
        match tokio::time::timeout(grace, rx.wait_for(|n| *n == 0)).await {
            Ok(result) => result.is_ok(),
            Err(_) => false,
        }
    }
}
