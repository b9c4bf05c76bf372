//! Detached side effects
//!
//! Cache refreshes, SMS and audit writes run here. The request that submits
//! them never awaits them; each one gets its own timeout and its failure is
//! only logged.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct BackgroundTasks {
    timeout: Duration,
    in_flight: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

struct InFlightGuard {
    in_flight: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

impl BackgroundTasks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            in_flight: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run `work` detached from the caller
    pub fn spawn<F>(&self, task: &'static str, work: F) -> JoinHandle<()>
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let guard = InFlightGuard {
            in_flight: self.in_flight.clone(),
            idle: self.idle.clone(),
        };
        let timeout = self.timeout;

        tokio::spawn(async move {
            let _guard = guard;
            match tokio::time::timeout(timeout, work).await {
                Ok(Ok(())) => debug!(task, "Background task completed"),
                Ok(Err(e)) => warn!(task, error = %e, "Background task failed"),
                Err(_) => warn!(
                    task,
                    timeout_ms = timeout.as_millis() as u64,
                    "Background task timed out"
                ),
            }
        })
    }

    /// Wait until no task is running
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Wait for running tasks, giving up after `limit`. Returns false on timeout.
    pub async fn drain(&self, limit: Duration) -> bool {
        tokio::time::timeout(limit, self.wait_idle()).await.is_ok()
    }
}
