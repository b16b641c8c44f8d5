use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};

use crate::config::GovernorConfig;
use crate::events::{noop_sink, EventSink, GovernorEvent};
use crate::governor::limits::{wait_before_resume, RateLimitInfo};
use crate::governor::queue::{PendingQueue, Priority, QueuedJob};
use crate::resilience::retry::RetryPolicy;
use crate::resilience::token_bucket::{TokenBucket, TokenBucketSnapshot};
use crate::{Error, Result};

/// Facts-only snapshot of the governor's runtime state.
#[derive(Debug, Clone)]
pub struct GovernorSnapshot {
    pub bucket: TokenBucketSnapshot,
    pub queue_size: usize,
}

struct QueueState {
    pending: PendingQueue,
    /// True while the drain task is running. Guarded by the same mutex as
    /// the queue so the exit/start handoff has no lost-wakeup window.
    draining: bool,
}

struct GovernorShared {
    bucket: TokenBucket,
    queue: Mutex<QueueState>,
    limits: Mutex<RateLimitInfo>,
    retry: RetryPolicy,
    sink: Arc<dyn EventSink>,
}

/// Single entry point for all outbound calls of one logical API client.
///
/// The governor enforces a token-bucket rate limit, queues requests that
/// cannot run immediately (priority first, submission order second), and
/// retries transient failures with exponential backoff.
///
/// Construct one governor per API client and pass it by reference; it owns
/// its bucket and queue exclusively.
///
/// # Example
///
/// ```rust,no_run
/// use request_governor::{GovernorConfig, Priority, RequestGovernor};
///
/// # async fn demo() -> request_governor::Result<()> {
/// let governor = RequestGovernor::new(GovernorConfig::from_requests_per_minute(60.0))?;
///
/// let response = governor
///     .execute_request(Priority::High, || async { call_generation_api().await })
///     .await?;
/// # Ok(())
/// # }
/// # async fn call_generation_api() -> request_governor::Result<String> { Ok(String::new()) }
/// ```
#[derive(Clone)]
pub struct RequestGovernor {
    shared: Arc<GovernorShared>,
}

impl RequestGovernor {
    /// Create a governor with a no-op event sink.
    ///
    /// Fails fast on invalid configuration (zero capacity, non-positive
    /// refill rate, inverted delays).
    pub fn new(config: GovernorConfig) -> Result<Self> {
        Self::with_sink(config, noop_sink())
    }

    /// Create a governor that reports events to `sink`.
    pub fn with_sink(config: GovernorConfig, sink: Arc<dyn EventSink>) -> Result<Self> {
        config.validate()?;
        let bucket = TokenBucket::new(config.capacity, config.refill_rate_per_sec)?;
        let retry = RetryPolicy::new()
            .with_max_retries(config.max_retries)
            .with_base_delay(config.base_delay)
            .with_max_delay(config.max_delay);
        Ok(Self {
            shared: Arc::new(GovernorShared {
                bucket,
                queue: Mutex::new(QueueState {
                    pending: PendingQueue::new(),
                    draining: false,
                }),
                limits: Mutex::new(RateLimitInfo::default()),
                retry,
                sink,
            }),
        })
    }

    /// Execute `operation` under the rate limit.
    ///
    /// If a token is available the operation runs immediately and its outcome
    /// is returned directly, with no queuing overhead. Otherwise the request
    /// is enqueued at its priority position and the caller suspends until the
    /// drain task has run it.
    ///
    /// A request discarded by [`clear_queue`](Self::clear_queue) before it
    /// ran resolves with [`Error::Cancelled`].
    pub async fn execute_request<T, F, Fut>(&self, priority: Priority, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        if self.shared.bucket.try_consume().await {
            return operation().await;
        }

        let (tx, rx) = oneshot::channel::<Result<T>>();
        let job: QueuedJob = Box::pin(async move {
            let outcome = operation().await;
            // the waiter may have gone away; its outcome is simply dropped
            let _ = tx.send(outcome);
        });

        let id = {
            let mut qs = self.shared.queue.lock().await;
            let id = qs.pending.insert(priority, job);
            if !qs.draining {
                qs.draining = true;
                tokio::spawn(drain(Arc::clone(&self.shared)));
            }
            id
        };
        debug!(request_id = %id, ?priority, "no token available; request queued");

        match rx.await {
            Ok(outcome) => outcome,
            // the job was dropped without running (queue cleared)
            Err(_) => Err(Error::Cancelled),
        }
    }

    /// Execute `operation` with retry on transient failure, using the default
    /// classifier ([`Error::is_retriable`]).
    ///
    /// An explicit [`Error::RateLimited`] failure is intercepted: the
    /// governor waits out the signaled budget (emitting
    /// [`GovernorEvent::RateLimitExceeded`]), replenishes the bucket, and
    /// re-attempts.
    pub async fn execute_with_retry<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        self.execute_with_retry_and(operation, |err| err.is_retriable())
            .await
    }

    /// [`execute_with_retry`](Self::execute_with_retry) with a caller-supplied
    /// retriability classifier.
    pub async fn execute_with_retry_and<T, F, Fut, C>(
        &self,
        operation: F,
        is_retriable: C,
    ) -> Result<T>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T>> + Send,
        C: Fn(&Error) -> bool + Send + Sync,
        T: Send,
    {
        let policy = &self.shared.retry;
        for attempt in 0..=policy.max_retries {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(Error::RateLimited { retry_after }) if attempt < policy.max_retries => {
                    self.shared.handle_rate_limit_exceeded(retry_after).await;
                }
                Err(err) => {
                    if attempt == policy.max_retries || !is_retriable(&err) {
                        return Err(err);
                    }
                    let delay = policy.backoff_delay(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure; backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
        // The loop always returns on the last attempt; this is defensive only.
        Err(Error::runtime_with_context(
            "retry loop exited without running an attempt",
            crate::ErrorContext::new().with_source("governor"),
        ))
    }

    /// Number of requests currently waiting in the queue.
    pub async fn queue_size(&self) -> usize {
        self.shared.queue.lock().await.pending.len()
    }

    /// Discard all pending requests without running them.
    ///
    /// Every waiter observes [`Error::Cancelled`]; a request already handed
    /// to the drain task is not affected.
    pub async fn clear_queue(&self) {
        let drained = {
            let mut qs = self.shared.queue.lock().await;
            qs.pending.clear()
        };
        if !drained.is_empty() {
            debug!(discarded = drained.len(), "pending queue cleared");
        }
        // dropping the jobs drops their outcome channels, which releases the
        // waiters with a cancellation outcome
        drop(drained);
    }

    /// Record advisory rate-limit metadata from the remote service.
    ///
    /// This only informs the wait after an explicit rate-limit-exceeded
    /// signal; the local bucket simulation is unaffected.
    pub async fn update_rate_limit_info(&self, info: RateLimitInfo) {
        *self.shared.limits.lock().await = info;
    }

    /// Snapshot current runtime facts for application-layer orchestration.
    pub async fn snapshot(&self) -> GovernorSnapshot {
        GovernorSnapshot {
            bucket: self.shared.bucket.snapshot().await,
            queue_size: self.queue_size().await,
        }
    }
}

impl GovernorShared {
    /// Wait out an explicitly signaled rate limit, then replenish the bucket.
    ///
    /// The wait comes from the service's `retry_after` when provided, else
    /// the tracked reset time, else a 60 second default. Interested observers
    /// are notified before the wait begins.
    async fn handle_rate_limit_exceeded(&self, retry_after: Option<Duration>) {
        let wait = {
            let limits = self.limits.lock().await;
            wait_before_resume(retry_after, Some(&*limits))
        };
        warn!(
            wait_secs = wait.as_secs_f64(),
            "remote rate limit exceeded; pausing requests"
        );
        let _ = self
            .sink
            .report(GovernorEvent::RateLimitExceeded { wait })
            .await;
        tokio::time::sleep(wait).await;
        self.bucket.reset_full().await;
    }
}

/// Queue-drain loop. At most one instance runs per governor; `execute_request`
/// starts it on the first enqueue and it exits once the queue is empty.
///
/// A failing queued operation delivers its error to its own waiter only and
/// never stops the loop.
async fn drain(shared: Arc<GovernorShared>) {
    loop {
        {
            let mut qs = shared.queue.lock().await;
            if qs.pending.is_empty() {
                qs.draining = false;
                return;
            }
        }

        shared.bucket.wait_for_token().await;

        let next = {
            let mut qs = shared.queue.lock().await;
            match qs.pending.pop_front() {
                Some(request) => request,
                None => {
                    // cleared while waiting for a token
                    qs.draining = false;
                    return;
                }
            }
        };

        debug!(
            request_id = %next.id,
            priority = ?next.priority,
            queued_ms = next.enqueued_at.elapsed().as_millis() as u64,
            "draining queued request"
        );
        next.job.await;
    }
}
