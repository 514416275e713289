//! Error types for job submission, execution, and result delivery.

use crate::types::{JobId, JobKind};
use std::time::Duration;

/// Errors raised while submitting jobs or starting the worker.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// The worker side of the queue is gone and no job can be accepted
    #[error("job queue is closed")]
    Closed,

    /// `run` was called on a queue whose worker is already started
    #[error("job queue worker is already running")]
    AlreadyRunning,
}

/// Failures reported by the wallet service for a single job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    /// The backend has no implementation for this kind of job
    #[error("{0} is not supported by this wallet")]
    Unsupported(JobKind),

    /// A transfer was submitted without a transaction id
    #[error("{0} requires a transaction id")]
    MissingTransaction(JobKind),

    /// The wallet refused the request
    #[error("wallet rejected the request: {0}")]
    Rejected(String),
}

/// Why a job finished without producing a result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobFailure {
    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// The handler panicked; the worker caught it and moved on
    #[error("job handler panicked")]
    Panicked,
}

/// Errors returned when waiting on a [`WaitHandle`](crate::WaitHandle).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AwaitError {
    /// No result arrived within the wait bound
    #[error("job {job_id} timed out after {after:?}")]
    Timeout { job_id: JobId, after: Duration },

    /// The job was dropped before any outcome was produced
    #[error("job {job_id} ended without delivering a result")]
    Unfulfilled { job_id: JobId },

    /// The job ran but failed
    #[error("job {job_id} failed: {failure}")]
    Failed { job_id: JobId, failure: JobFailure },

    /// The handle was already closed and holds no recorded result
    #[error("wait handle for job {job_id} was already consumed")]
    AlreadyConsumed { job_id: JobId },
}

impl AwaitError {
    /// The job this error refers to.
    pub fn job_id(&self) -> JobId {
        match self {
            AwaitError::Timeout { job_id, .. }
            | AwaitError::Unfulfilled { job_id }
            | AwaitError::Failed { job_id, .. }
            | AwaitError::AlreadyConsumed { job_id } => *job_id,
        }
    }
}
