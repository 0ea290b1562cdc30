//! Deferred task scheduler
//!
//! Runs one-shot actions after a delay on tracked tokio tasks. The scheduler
//! owns the retry policy and failure reporting, and every submission returns
//! a [`TaskHandle`] through which the outcome can be observed.

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{sync::watch, time::sleep};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Retry policy for deferred actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the first retry, doubled for each further retry
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Backoff to wait after the given failed attempt (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff_base.saturating_mul(factor)
    }
}

/// Lifecycle of a deferred task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Waiting for its delay to elapse
    Scheduled,
    /// Action is executing
    Running { attempt: u32 },
    Completed,
    /// Every attempt failed
    Failed { attempts: u32, error: String },
    /// Dropped during shutdown before it could finish
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed { .. } | TaskStatus::Cancelled
        )
    }
}

/// Observer for a submitted task
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: Uuid,
    status: watch::Receiver<TaskStatus>,
}

impl TaskHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current status without waiting
    pub fn status(&self) -> TaskStatus {
        self.status.borrow().clone()
    }

    /// Wait until the task reaches a terminal status
    ///
    /// A task dropped by the runtime before finishing reports `Cancelled`.
    pub async fn wait(&self) -> TaskStatus {
        let mut status = self.status.clone();
        let waited = status
            .wait_for(TaskStatus::is_terminal)
            .await
            .map(|terminal| (*terminal).clone());
        match waited {
            Ok(terminal) => terminal,
            Err(_) => {
                let last = status.borrow().clone();
                if last.is_terminal() { last } else { TaskStatus::Cancelled }
            }
        }
    }
}

struct Inner {
    tracker: TaskTracker,
    cancel: CancellationToken,
    retry: RetryPolicy,
    failures: AtomicU64,
}

/// Scheduler for one-shot deferred actions
#[derive(Clone)]
pub struct TaskScheduler {
    inner: Arc<Inner>,
}

impl TaskScheduler {
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                tracker: TaskTracker::new(),
                cancel: CancellationToken::new(),
                retry,
                failures: AtomicU64::new(0),
            }),
        }
    }

    /// Run `action` once after `delay`, retrying it on failure
    ///
    /// The action is a factory so that each retry gets a fresh future. Once
    /// [`shutdown`](Self::shutdown) has started, submissions are refused and
    /// the returned handle is already [`TaskStatus::Cancelled`].
    pub fn submit<F, Fut>(&self, name: impl Into<String>, delay: Duration, action: F) -> TaskHandle
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let id = Uuid::new_v4();
        let name = name.into();
        let (sender, receiver) = watch::channel(TaskStatus::Scheduled);
        let handle = TaskHandle {
            id,
            status: receiver,
        };

        if self.inner.tracker.is_closed() {
            warn!(task_id = %id, task = %name, "Scheduler is shutting down, task refused");
            sender.send_replace(TaskStatus::Cancelled);
            return handle;
        }

        let inner = self.inner.clone();
        self.inner.tracker.spawn(async move {
            inner.run(id, &name, delay, action, sender).await;
        });

        handle
    }

    /// Number of tasks that have not finished yet
    pub fn pending(&self) -> usize {
        self.inner.tracker.len()
    }

    /// Number of tasks that exhausted their retries
    pub fn failures(&self) -> u64 {
        self.inner.failures.load(Ordering::Relaxed)
    }

    /// Stop accepting tasks and let outstanding ones fire
    ///
    /// Tasks still outstanding once `grace` has elapsed are cancelled and
    /// logged. Returns how many were cancelled.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        self.inner.tracker.close();

        let pending = self.pending();
        if pending > 0 {
            info!("Waiting up to {:?} for {} deferred tasks", grace, pending);
        }

        if tokio::time::timeout(grace, self.inner.tracker.wait())
            .await
            .is_ok()
        {
            return 0;
        }

        let remaining = self.pending();
        warn!("Cancelling {} deferred tasks after shutdown grace period", remaining);
        self.inner.cancel.cancel();
        self.inner.tracker.wait().await;
        remaining
    }
}

impl Inner {
    async fn run<F, Fut>(
        &self,
        id: Uuid,
        name: &str,
        delay: Duration,
        action: F,
        status: watch::Sender<TaskStatus>,
    ) where
        F: Fn() -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        if !self.sleep_unless_cancelled(delay).await {
            warn!(task_id = %id, task = %name, "Deferred task cancelled before it ran");
            status.send_replace(TaskStatus::Cancelled);
            return;
        }

        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            status.send_replace(TaskStatus::Running { attempt });

            match action().await {
                Ok(()) => {
                    info!(task_id = %id, task = %name, attempt, "Deferred task completed");
                    status.send_replace(TaskStatus::Completed);
                    return;
                }
                Err(e) if attempt < max_attempts => {
                    let backoff = self.retry.backoff(attempt);
                    warn!(
                        task_id = %id,
                        task = %name,
                        attempt,
                        "Deferred task failed, retrying in {:?}: {:#}",
                        backoff,
                        e
                    );

                    if !self.sleep_unless_cancelled(backoff).await {
                        warn!(task_id = %id, task = %name, "Deferred task cancelled while retrying");
                        status.send_replace(TaskStatus::Cancelled);
                        return;
                    }
                    attempt += 1;
                }
                Err(e) => {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    error!(
                        task_id = %id,
                        task = %name,
                        attempts = attempt,
                        "Deferred task failed permanently: {:#}",
                        e
                    );
                    status.send_replace(TaskStatus::Failed {
                        attempts: attempt,
                        error: format!("{:#}", e),
                    });
                    return;
                }
            }
        }
    }

    /// Sleep for `duration`; false if cancellation won the race
    async fn sleep_unless_cancelled(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = sleep(duration) => true,
        }
    }
}
