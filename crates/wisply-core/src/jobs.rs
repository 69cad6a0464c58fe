// ── Enforcement job queue ──
//
// Discrete, retryable units of work so a web request or scheduler tick
// never blocks on router I/O. Delivery is at-least-once: handlers are
// idempotent (the enforcer re-verifies device state instead of blindly
// re-applying), transient device failures are retried on a backoff
// schedule, and configuration errors are not retried at all -- they fail
// identically every time.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::enforcer::AccessEnforcer;
use crate::error::CoreError;

const QUEUE_DEPTH: usize = 64;

/// One unit of enforcement work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforcementJob {
    Isolate { customer_id: i64 },
    Reconnect { customer_id: i64 },
}

impl EnforcementJob {
    fn customer_id(self) -> i64 {
        match self {
            Self::Isolate { customer_id } | Self::Reconnect { customer_id } => customer_id,
        }
    }

    fn kind(self) -> &'static str {
        match self {
            Self::Isolate { .. } => "isolate",
            Self::Reconnect { .. } => "reconnect",
        }
    }
}

/// Single-consumer queue feeding the enforcer.
///
/// Jobs for the same customer are additionally serialized by the
/// enforcer's per-customer lock, so a re-enqueued job racing a retry
/// cannot interleave.
pub struct EnforcementQueue {
    tx: mpsc::Sender<EnforcementJob>,
    cancel: CancellationToken,
    worker: JoinHandle<()>,
}

impl EnforcementQueue {
    /// Spawn the worker task and return the queue handle.
    pub fn start(enforcer: Arc<AccessEnforcer>, backoff: Vec<std::time::Duration>) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let cancel = CancellationToken::new();
        let worker = tokio::spawn(worker_task(enforcer, rx, cancel.clone(), backoff));
        Self { tx, cancel, worker }
    }

    /// Enqueue a job. Fails only when the queue has been shut down.
    pub async fn enqueue(&self, job: EnforcementJob) -> Result<(), CoreError> {
        self.tx.send(job).await.map_err(|_| CoreError::QueueClosed)
    }

    /// Stop the worker after it finishes the job in hand.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        drop(self.tx);
        let _ = self.worker.await;
    }
}

async fn worker_task(
    enforcer: Arc<AccessEnforcer>,
    mut rx: mpsc::Receiver<EnforcementJob>,
    cancel: CancellationToken,
    backoff: Vec<std::time::Duration>,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            job = rx.recv() => {
                let Some(job) = job else { break };
                run_with_retries(&enforcer, job, &backoff, &cancel).await;
            }
        }
    }
}

async fn run_with_retries(
    enforcer: &AccessEnforcer,
    job: EnforcementJob,
    backoff: &[std::time::Duration],
    cancel: &CancellationToken,
) {
    let mut attempt = 0usize;
    loop {
        let result = match job {
            EnforcementJob::Isolate { customer_id } => enforcer.isolate(customer_id).await,
            EnforcementJob::Reconnect { customer_id } => enforcer.reconnect(customer_id).await,
        };

        match result {
            Ok(outcome) => {
                info!(
                    kind = job.kind(),
                    customer_id = job.customer_id(),
                    ?outcome,
                    attempt,
                    "enforcement job finished"
                );
                return;
            }
            Err(e) if e.is_retryable() && attempt < backoff.len() => {
                let delay = backoff[attempt];
                warn!(
                    kind = job.kind(),
                    customer_id = job.customer_id(),
                    error = %e,
                    retry_in_secs = delay.as_secs(),
                    "enforcement job failed, will retry"
                );
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
            Err(e) => {
                error!(
                    kind = job.kind(),
                    customer_id = job.customer_id(),
                    error = %e,
                    attempt,
                    "enforcement job gave up"
                );
                return;
            }
        }
    }
}
