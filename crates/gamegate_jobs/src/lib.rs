//! # Gamegate Jobs - Correlating Job Queue
//!
//! Offloads slow wallet operations (balance queries, deposits, withdrawals)
//! from a connection's message loop onto a dedicated background worker, and
//! lets the caller await the result of one specific job.
//!
//! ## Components
//!
//! * [`JobQueue`] - Bounded FIFO of jobs drained in order by exactly one worker
//! * [`WaitHandle`] - One-shot promise correlating a submitted job to its result
//! * [`WalletBackend`] - The external wallet service the worker talks to
//! * [`TransactionIdGenerator`] - Formats transaction ids for transfers
//!
//! ## Flow
//!
//! 1. The caller submits a [`JobRequest`] with routing [`JobMeta`]
//! 2. The queue assigns the next [`JobId`] and pushes the job (blocking while full)
//! 3. The worker dispatches the request to the wallet backend
//! 4. The outcome is delivered through the [`WaitHandle`], unless the waiter gave up
//!
//! ```rust
//! # use std::sync::Arc;
//! # use gamegate_jobs::*;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let wallet = Arc::new(SimulatedWallet::new(WalletConfig::instant()));
//! let queue = JobQueue::new(QueueConfig::default(), wallet);
//! let _worker = queue.run()?;
//!
//! let meta = JobMeta::new(PlatformId(1), UserId(42));
//! let mut handle = queue.submit(meta, JobRequest::BalanceGet).await?;
//! let result = queue.wait(&mut handle).await?;
//! assert_eq!(result.amount(), 1000);
//! # Ok(())
//! # }
//! ```

pub use error::{AwaitError, JobFailure, QueueError, WalletError};
pub use queue::{JobQueue, QueueConfig, WorkerReport, DEFAULT_AWAIT_TIMEOUT, DEFAULT_QUEUE_CAPACITY};
pub use transaction::{TransactionIdGenerator, TransactionType};
pub use types::{
    BalanceResult, JobId, JobKind, JobMeta, JobRequest, JobResult, PlatformId, TransactionId,
    TransferResult, UserId,
};
pub use wait::{WaitHandle, WaitState};
pub use wallet::{SimulatedWallet, WalletBackend, WalletConfig};

pub mod error;
pub mod queue;
pub mod transaction;
pub mod types;
pub mod wait;
pub mod wallet;
