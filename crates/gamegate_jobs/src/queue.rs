//! The bounded job queue and its single worker.

use crate::error::{AwaitError, JobFailure, QueueError, WalletError};
use crate::types::{Job, JobId, JobMeta, JobRequest, JobResult};
use crate::wait::{self, WaitHandle};
use crate::wallet::WalletBackend;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Default number of jobs a queue buffers before `enqueue` blocks.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Default bound applied by [`JobQueue::wait`].
pub const DEFAULT_AWAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Queue sizing and wait bound.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum number of pending jobs
    pub capacity: usize,

    /// How long [`JobQueue::wait`] waits for a result (`None` waits forever)
    pub await_timeout: Option<Duration>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            await_timeout: Some(DEFAULT_AWAIT_TIMEOUT),
        }
    }
}

/// Counters reported by the worker when it exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    /// Jobs dequeued and executed
    pub processed: u64,
    /// Outcomes handed to a waiting caller
    pub delivered: u64,
    /// Outcomes discarded because the waiter had closed its handle
    pub dropped: u64,
    /// Jobs whose handler failed, panics included
    pub failed: u64,
}

/// Bounded FIFO of wallet jobs drained by exactly one worker.
///
/// Job ids are allocated under a lock that is held until the job is in the
/// FIFO, so queue order always equals id order even with concurrent
/// submitters. A full FIFO blocks the submitter instead of rejecting the job.
///
/// Dropping the queue lets the worker finish the jobs already queued and exit.
pub struct JobQueue {
    config: QueueConfig,
    sender: mpsc::Sender<Job>,
    receiver: Mutex<Option<mpsc::Receiver<Job>>>,
    last_id: tokio::sync::Mutex<u64>,
    backend: Arc<dyn WalletBackend>,
}

impl JobQueue {
    /// Creates a queue whose worker will execute jobs against `backend`.
    ///
    /// The worker does not start until [`run`](JobQueue::run) is called.
    pub fn new(config: QueueConfig, backend: Arc<dyn WalletBackend>) -> Self {
        let capacity = config.capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        debug!("📦 Job queue created with capacity {}", capacity);

        Self {
            config: QueueConfig { capacity, ..config },
            sender,
            receiver: Mutex::new(Some(receiver)),
            last_id: tokio::sync::Mutex::new(0),
            backend,
        }
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Number of jobs currently waiting in the FIFO.
    pub fn pending(&self) -> usize {
        self.config.capacity - self.sender.capacity()
    }

    /// Pushes a job, blocking while the FIFO is full.
    ///
    /// Returns a [`WaitHandle`] when `want_result` is set; otherwise the job
    /// is fire-and-forget and `None` is returned.
    pub async fn enqueue(
        &self,
        meta: JobMeta,
        request: JobRequest,
        want_result: bool,
    ) -> Result<Option<WaitHandle>, QueueError> {
        let mut last_id = self.last_id.lock().await;
        let job_id = JobId(*last_id + 1);
        let kind = request.kind();

        let (completer, handle) = if want_result {
            let (completer, handle) = wait::pair(job_id);
            (Some(completer), Some(handle))
        } else {
            (None, None)
        };

        self.sender
            .send(Job::new(job_id, meta, request, completer))
            .await
            .map_err(|_| QueueError::Closed)?;
        *last_id = job_id.0;
        drop(last_id);

        debug!(
            "📥 Queued {} job {} [{}/{}]",
            kind,
            job_id,
            self.pending(),
            self.config.capacity
        );
        Ok(handle)
    }

    /// Pushes a job and returns the handle to await its result.
    pub async fn submit(&self, meta: JobMeta, request: JobRequest) -> Result<WaitHandle, QueueError> {
        self.enqueue(meta, request, true)
            .await?
            .ok_or(QueueError::Closed)
    }

    /// Pushes a job whose result nobody waits for.
    pub async fn submit_detached(&self, meta: JobMeta, request: JobRequest) -> Result<(), QueueError> {
        self.enqueue(meta, request, false).await.map(|_| ())
    }

    /// Waits for the handle's result using the queue's configured bound.
    pub async fn wait(&self, handle: &mut WaitHandle) -> Result<JobResult, AwaitError> {
        trace!("⏳ Waiting for job {}", handle.job_id());
        let result = handle.wait(self.config.await_timeout).await;
        trace!("Finished waiting for job {}", handle.job_id());
        result
    }

    /// Starts the worker.
    ///
    /// Exactly one worker exists per queue; a second call fails with
    /// [`QueueError::AlreadyRunning`]. The returned task resolves to the
    /// worker's report once the queue has been dropped and drained.
    pub fn run(&self) -> Result<JoinHandle<WorkerReport>, QueueError> {
        let receiver = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(QueueError::AlreadyRunning)?;

        Ok(tokio::spawn(worker_loop(receiver, self.backend.clone())))
    }
}

async fn worker_loop(mut receiver: mpsc::Receiver<Job>, backend: Arc<dyn WalletBackend>) -> WorkerReport {
    info!("👷 Job worker started");
    let mut report = WorkerReport::default();

    while let Some(job) = receiver.recv().await {
        let (job_id, meta, request, completer) = job.into_parts();
        let kind = request.kind();
        trace!("Running {} job {} for user {}", kind, job_id, meta.user_id);

        let outcome = match AssertUnwindSafe(dispatch(backend.as_ref(), &meta, &request))
            .catch_unwind()
            .await
        {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                warn!("⚠️ {} job {} failed: {}", kind, job_id, e);
                Err(JobFailure::Wallet(e))
            }
            Err(_) => {
                error!("💥 {} job {} panicked; worker continues", kind, job_id);
                Err(JobFailure::Panicked)
            }
        };

        report.processed += 1;
        if outcome.is_err() {
            report.failed += 1;
        }

        if let Some(completer) = completer {
            if completer.complete(outcome) {
                report.delivered += 1;
            } else {
                report.dropped += 1;
            }
        }

        debug!("✅ Finished {} job {}", kind, job_id);
    }

    info!(
        "👋 Job worker exiting: {} processed, {} delivered, {} dropped",
        report.processed, report.delivered, report.dropped
    );
    report
}

async fn dispatch(
    backend: &dyn WalletBackend,
    meta: &JobMeta,
    request: &JobRequest,
) -> Result<JobResult, WalletError> {
    match request {
        JobRequest::BalanceGet => backend.balance(meta).await.map(JobResult::BalanceGet),
        JobRequest::Deposit { amount } => backend.deposit(meta, *amount).await.map(JobResult::Deposit),
        JobRequest::Withdraw { amount } => backend.withdraw(meta, *amount).await.map(JobResult::Withdraw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WalletError;
    use crate::transaction::{TransactionIdGenerator, TransactionType};
    use crate::types::{BalanceResult, JobKind, PlatformId, TransferResult, UserId};
    use crate::wallet::{SimulatedWallet, WalletConfig};
    use async_trait::async_trait;

    /// Records the order in which users reach the wallet.
    #[derive(Default)]
    struct RecordingWallet {
        delay: Duration,
        seen: Mutex<Vec<UserId>>,
    }

    #[async_trait]
    impl WalletBackend for RecordingWallet {
        async fn balance(&self, meta: &JobMeta) -> Result<BalanceResult, WalletError> {
            self.seen.lock().unwrap().push(meta.user_id);
            tokio::time::sleep(self.delay).await;
            Ok(BalanceResult {
                user_id: meta.user_id,
                amount: meta.user_id.0 * 10,
            })
        }

        async fn deposit(&self, meta: &JobMeta, amount: i64) -> Result<TransferResult, WalletError> {
            Ok(TransferResult {
                user_id: meta.user_id,
                amount,
                transaction_id: meta.transaction_id.clone().unwrap(),
            })
        }
    }

    struct PanickingWallet;

    #[async_trait]
    impl WalletBackend for PanickingWallet {
        async fn balance(&self, meta: &JobMeta) -> Result<BalanceResult, WalletError> {
            if meta.user_id == UserId(13) {
                panic!("wallet exploded");
            }
            Ok(BalanceResult {
                user_id: meta.user_id,
                amount: 1,
            })
        }

        async fn deposit(&self, _meta: &JobMeta, _amount: i64) -> Result<TransferResult, WalletError> {
            Err(WalletError::Rejected("closed".to_string()))
        }
    }

    fn meta(user: i64) -> JobMeta {
        JobMeta::new(PlatformId(1), UserId(user))
    }

    #[tokio::test]
    async fn test_balance_get_returns_simulated_amount() {
        let wallet = SimulatedWallet::new(WalletConfig {
            balance_delay_ms: 20,
            ..WalletConfig::default()
        });
        let queue = JobQueue::new(QueueConfig::default(), Arc::new(wallet));
        queue.run().expect("worker starts");

        let mut handle = queue
            .submit(meta(42), JobRequest::BalanceGet)
            .await
            .expect("job is queued");
        let result = queue.wait(&mut handle).await.expect("balance is delivered");

        assert_eq!(result.kind(), JobKind::BalanceGet);
        assert_eq!(result.amount(), 1000);
        match result {
            JobResult::BalanceGet(balance) => assert_eq!(balance.user_id, UserId(42)),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_deposit_echoes_transaction_id() {
        let queue = JobQueue::new(
            QueueConfig::default(),
            Arc::new(SimulatedWallet::new(WalletConfig::instant())),
        );
        queue.run().expect("worker starts");

        let transactions = TransactionIdGenerator::new();
        let transaction_id = transactions.make_id(PlatformId(1), UserId(42), TransactionType::Deposit);
        let mut handle = queue
            .submit(
                meta(42).with_transaction(transaction_id.clone()),
                JobRequest::Deposit { amount: 1000 },
            )
            .await
            .expect("job is queued");

        let result = queue.wait(&mut handle).await.expect("deposit is delivered");
        assert_eq!(result.amount(), 1000);
        assert_eq!(result.transaction_id(), Some(&transaction_id));
        assert!(transaction_id.as_str().starts_with("1-42-deposit-"));
    }

    #[tokio::test]
    async fn test_ids_increase_and_results_follow_enqueue_order() {
        let wallet = Arc::new(RecordingWallet::default());
        let queue = JobQueue::new(QueueConfig::default(), wallet.clone());
        queue.run().expect("worker starts");

        let mut handles = Vec::new();
        for user in 1..=20 {
            handles.push(queue.submit(meta(user), JobRequest::BalanceGet).await.unwrap());
        }

        let ids: Vec<u64> = handles.iter().map(|h| h.job_id().0).collect();
        assert_eq!(ids, (1..=20).collect::<Vec<_>>());

        for (index, handle) in handles.iter_mut().enumerate() {
            let result = queue.wait(handle).await.expect("result delivered");
            assert_eq!(result.amount(), (index as i64 + 1) * 10);
        }

        let seen = wallet.seen.lock().unwrap().clone();
        assert_eq!(seen, (1..=20).map(UserId).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_concurrent_submitters_get_unique_ids() {
        let queue = Arc::new(JobQueue::new(
            QueueConfig::default(),
            Arc::new(RecordingWallet::default()),
        ));
        queue.run().expect("worker starts");

        let mut tasks = Vec::new();
        for user in 0..16 {
            let queue = queue.clone();
            tasks.push(tokio::spawn(async move {
                queue.submit(meta(user), JobRequest::BalanceGet).await.unwrap().job_id()
            }));
        }

        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap().0);
        }
        ids.sort_unstable();
        assert_eq!(ids, (1..=16).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_full_queue_blocks_until_worker_dequeues() {
        let queue = Arc::new(JobQueue::new(
            QueueConfig {
                capacity: 2,
                ..QueueConfig::default()
            },
            Arc::new(RecordingWallet::default()),
        ));

        queue.submit_detached(meta(1), JobRequest::BalanceGet).await.unwrap();
        queue.submit_detached(meta(2), JobRequest::BalanceGet).await.unwrap();
        assert_eq!(queue.pending(), 2);

        let blocked = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.submit(meta(3), JobRequest::BalanceGet).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!blocked.is_finished(), "third enqueue should wait for room");

        queue.run().expect("worker starts");
        let mut handle = tokio::time::timeout(Duration::from_secs(2), blocked)
            .await
            .expect("enqueue unblocks once the worker drains")
            .unwrap()
            .expect("job is queued");

        assert_eq!(handle.job_id(), JobId(3));
        assert_eq!(queue.wait(&mut handle).await.unwrap().amount(), 30);
    }

    #[tokio::test]
    async fn test_timed_out_result_is_dropped_by_worker() {
        let wallet = Arc::new(RecordingWallet {
            delay: Duration::from_millis(100),
            ..RecordingWallet::default()
        });
        let queue = JobQueue::new(
            QueueConfig {
                await_timeout: Some(Duration::from_millis(10)),
                ..QueueConfig::default()
            },
            wallet,
        );
        let worker = queue.run().expect("worker starts");

        let mut handle = queue.submit(meta(5), JobRequest::BalanceGet).await.unwrap();
        let err = queue.wait(&mut handle).await.expect_err("wallet is too slow");
        assert!(matches!(err, AwaitError::Timeout { job_id: JobId(1), .. }));

        // Waiting again on the closed handle returns at once.
        let again = tokio::time::timeout(Duration::from_millis(50), queue.wait(&mut handle))
            .await
            .expect("closed handle never blocks");
        assert_eq!(again, Err(AwaitError::AlreadyConsumed { job_id: JobId(1) }));

        drop(queue);
        let report = worker.await.expect("worker exits cleanly");
        assert_eq!(report.processed, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.delivered, 0);
    }

    #[tokio::test]
    async fn test_panicking_handler_is_isolated() {
        let queue = JobQueue::new(QueueConfig::default(), Arc::new(PanickingWallet));
        let worker = queue.run().expect("worker starts");

        let mut boom = queue.submit(meta(13), JobRequest::BalanceGet).await.unwrap();
        let mut fine = queue.submit(meta(14), JobRequest::BalanceGet).await.unwrap();

        let err = queue.wait(&mut boom).await.expect_err("handler panicked");
        assert_eq!(
            err,
            AwaitError::Failed {
                job_id: JobId(1),
                failure: JobFailure::Panicked
            }
        );
        assert_eq!(queue.wait(&mut fine).await.unwrap().amount(), 1);

        drop(queue);
        let report = worker.await.unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_withdraw_reports_unsupported() {
        let queue = JobQueue::new(
            QueueConfig::default(),
            Arc::new(SimulatedWallet::new(WalletConfig::instant())),
        );
        queue.run().expect("worker starts");

        let mut handle = queue
            .submit(meta(1), JobRequest::Withdraw { amount: 10 })
            .await
            .unwrap();
        let err = queue.wait(&mut handle).await.expect_err("withdraw is a stub");
        assert_eq!(
            err,
            AwaitError::Failed {
                job_id: JobId(1),
                failure: JobFailure::Wallet(WalletError::Unsupported(JobKind::Withdraw)),
            }
        );
    }

    #[tokio::test]
    async fn test_run_twice_is_rejected() {
        let queue = JobQueue::new(QueueConfig::default(), Arc::new(RecordingWallet::default()));
        queue.run().expect("first run starts the worker");
        assert_eq!(queue.run().err(), Some(QueueError::AlreadyRunning));
    }

    #[tokio::test]
    async fn test_detached_jobs_still_run() {
        let wallet = Arc::new(RecordingWallet::default());
        let queue = JobQueue::new(QueueConfig::default(), wallet.clone());
        let worker = queue.run().unwrap();

        queue.submit_detached(meta(9), JobRequest::BalanceGet).await.unwrap();
        drop(queue);

        let report = worker.await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.delivered, 0);
        assert_eq!(*wallet.seen.lock().unwrap(), vec![UserId(9)]);
    }
}
