//! One-shot result delivery between the worker and the waiting caller.
//!
//! Each job that asks for its result gets a [`WaitHandle`] (held by the caller)
//! and a [`Completer`] (travelling with the job). Both sides share an atomic
//! state that starts as `Pending` and is settled exactly once:
//!
//! * the worker moves it to `Fulfilled` right before sending the outcome
//! * the waiter moves it to `Abandoned` when it stops waiting without one
//!
//! Whoever loses the compare-and-swap backs off, so a delivery can never race
//! a closed handle.

use crate::error::{AwaitError, JobFailure};
use crate::types::{JobId, JobResult};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, trace};

const PENDING: u8 = 0;
const FULFILLED: u8 = 1;
const ABANDONED: u8 = 2;

/// What the worker hands back for one job.
pub(crate) type JobOutcome = Result<JobResult, JobFailure>;

/// Observable delivery state of a [`WaitHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    /// No outcome yet and the waiter is still interested
    Pending,
    /// The worker delivered an outcome
    Fulfilled,
    /// The waiter stopped waiting before anything was delivered
    Abandoned,
}

#[derive(Debug)]
struct DeliveryState(AtomicU8);

impl DeliveryState {
    fn new() -> Self {
        Self(AtomicU8::new(PENDING))
    }

    fn load(&self) -> WaitState {
        match self.0.load(Ordering::Acquire) {
            PENDING => WaitState::Pending,
            FULFILLED => WaitState::Fulfilled,
            _ => WaitState::Abandoned,
        }
    }

    /// Moves `Pending` to `target`. Returns `true` if this call settled the state.
    fn settle(&self, target: u8) -> bool {
        self.0
            .compare_exchange(PENDING, target, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Creates the two ends for one job.
pub(crate) fn pair(job_id: JobId) -> (Completer, WaitHandle) {
    let state = Arc::new(DeliveryState::new());
    let (tx, rx) = oneshot::channel();
    let completer = Completer {
        job_id,
        state: state.clone(),
        tx,
    };
    let handle = WaitHandle {
        job_id,
        state,
        rx: Some(rx),
        result: None,
    };
    (completer, handle)
}

/// Worker-side end of a job's result channel.
#[derive(Debug)]
pub(crate) struct Completer {
    job_id: JobId,
    state: Arc<DeliveryState>,
    tx: oneshot::Sender<JobOutcome>,
}

impl Completer {
    /// Delivers `outcome` unless the waiter already gave up.
    ///
    /// Returns `true` if the outcome was handed to the waiter.
    pub(crate) fn complete(self, outcome: JobOutcome) -> bool {
        if !self.state.settle(FULFILLED) {
            debug!("🗑️ Dropping result for job {}: waiter already closed its handle", self.job_id);
            return false;
        }
        // The receiver can only be gone here if the handle was dropped mid-settle,
        // in which case nobody is left to read the outcome either way.
        self.tx.send(outcome).is_ok()
    }
}

/// Caller-side end of a job's result channel.
///
/// Obtained from [`JobQueue::submit`](crate::JobQueue::submit). The first
/// [`wait`](WaitHandle::wait) consumes the channel and closes the handle;
/// later waits return immediately with the recorded result, or
/// [`AwaitError::AlreadyConsumed`] if none was recorded. Dropping a pending
/// handle abandons it, so the worker discards the late result.
#[derive(Debug)]
pub struct WaitHandle {
    job_id: JobId,
    state: Arc<DeliveryState>,
    rx: Option<oneshot::Receiver<JobOutcome>>,
    result: Option<JobResult>,
}

impl WaitHandle {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn state(&self) -> WaitState {
        self.state.load()
    }

    /// `true` once a wait has returned on this handle.
    pub fn is_closed(&self) -> bool {
        self.rx.is_none()
    }

    /// Waits for the job's outcome, for at most `timeout` when one is given.
    ///
    /// The handle is closed when this returns, whatever the outcome.
    pub async fn wait(&mut self, timeout: Option<Duration>) -> Result<JobResult, AwaitError> {
        let job_id = self.job_id;
        let Some(mut rx) = self.rx.take() else {
            trace!("Wait on closed handle for job {}", job_id);
            return self
                .result
                .clone()
                .ok_or(AwaitError::AlreadyConsumed { job_id });
        };

        let received = match timeout {
            Some(limit) => tokio::time::timeout(limit, &mut rx).await.ok(),
            None => Some((&mut rx).await),
        };

        let outcome = match received {
            Some(Ok(outcome)) => outcome,
            Some(Err(_)) => {
                self.state.settle(ABANDONED);
                return Err(AwaitError::Unfulfilled { job_id });
            }
            None => {
                if self.state.settle(ABANDONED) {
                    debug!("⏰ Gave up waiting for job {}", job_id);
                    return Err(AwaitError::Timeout {
                        job_id,
                        after: timeout.unwrap_or_default(),
                    });
                }
                // The worker settled first, so its send is already underway.
                match rx.await {
                    Ok(outcome) => outcome,
                    Err(_) => return Err(AwaitError::Unfulfilled { job_id }),
                }
            }
        };

        match outcome {
            Ok(result) => {
                self.result = Some(result.clone());
                Ok(result)
            }
            Err(failure) => Err(AwaitError::Failed { job_id, failure }),
        }
    }
}

impl Drop for WaitHandle {
    fn drop(&mut self) {
        if self.state.settle(ABANDONED) {
            trace!("Wait handle for job {} dropped while pending", self.job_id);
        }
    }
}
