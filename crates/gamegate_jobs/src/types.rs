//! Job identifiers, routing metadata, and the typed request/result payloads.

use crate::wait::Completer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a job, unique and strictly increasing within one queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Third-party platform the wallet lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformId(pub u32);

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction id attached to wallet transfers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

impl TransactionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Routing metadata carried by every job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobMeta {
    pub platform_id: PlatformId,
    pub user_id: UserId,
    pub transaction_id: Option<TransactionId>,
}

impl JobMeta {
    pub fn new(platform_id: PlatformId, user_id: UserId) -> Self {
        Self {
            platform_id,
            user_id,
            transaction_id: None,
        }
    }

    /// Attaches the transaction id required by transfer jobs.
    pub fn with_transaction(mut self, transaction_id: TransactionId) -> Self {
        self.transaction_id = Some(transaction_id);
        self
    }
}

/// The kind of wallet operation a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    BalanceGet,
    Deposit,
    Withdraw,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobKind::BalanceGet => "BALANCE_GET",
            JobKind::Deposit => "DEPOSIT",
            JobKind::Withdraw => "WITHDRAW",
        };
        f.write_str(name)
    }
}

/// Work submitted to a queue, one variant per [`JobKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobRequest {
    /// Query the user's balance on the external wallet
    BalanceGet,
    /// Move `amount` from the external wallet into the game
    Deposit { amount: i64 },
    /// Move `amount` from the game back to the external wallet
    Withdraw { amount: i64 },
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::BalanceGet => JobKind::BalanceGet,
            JobRequest::Deposit { .. } => JobKind::Deposit,
            JobRequest::Withdraw { .. } => JobKind::Withdraw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResult {
    pub user_id: UserId,
    pub amount: i64,
}

/// Outcome of a deposit or withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResult {
    pub user_id: UserId,
    pub amount: i64,
    pub transaction_id: TransactionId,
}

/// Result delivered to the waiter, one variant per [`JobKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobResult {
    BalanceGet(BalanceResult),
    Deposit(TransferResult),
    Withdraw(TransferResult),
}

impl JobResult {
    pub fn kind(&self) -> JobKind {
        match self {
            JobResult::BalanceGet(_) => JobKind::BalanceGet,
            JobResult::Deposit(_) => JobKind::Deposit,
            JobResult::Withdraw(_) => JobKind::Withdraw,
        }
    }

    pub fn amount(&self) -> i64 {
        match self {
            JobResult::BalanceGet(balance) => balance.amount,
            JobResult::Deposit(transfer) | JobResult::Withdraw(transfer) => transfer.amount,
        }
    }

    /// The transaction id echoed by transfer results.
    pub fn transaction_id(&self) -> Option<&TransactionId> {
        match self {
            JobResult::BalanceGet(_) => None,
            JobResult::Deposit(transfer) | JobResult::Withdraw(transfer) => {
                Some(&transfer.transaction_id)
            }
        }
    }
}

/// A queued unit of work.
///
/// Built by [`JobQueue::enqueue`](crate::JobQueue::enqueue) and never mutated
/// afterwards; the worker takes it apart when it dequeues it.
#[derive(Debug)]
pub(crate) struct Job {
    id: JobId,
    meta: JobMeta,
    request: JobRequest,
    completer: Option<Completer>,
}

impl Job {
    pub(crate) fn new(
        id: JobId,
        meta: JobMeta,
        request: JobRequest,
        completer: Option<Completer>,
    ) -> Self {
        Self {
            id,
            meta,
            request,
            completer,
        }
    }

    pub(crate) fn into_parts(self) -> (JobId, JobMeta, JobRequest, Option<Completer>) {
        (self.id, self.meta, self.request, self.completer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_kinds() {
        assert_eq!(JobRequest::BalanceGet.kind(), JobKind::BalanceGet);
        assert_eq!(JobRequest::Deposit { amount: 5 }.kind(), JobKind::Deposit);
        assert_eq!(JobRequest::Withdraw { amount: 5 }.kind(), JobKind::Withdraw);
    }

    #[test]
    fn test_transfer_result_serializes_camel_case() {
        let result = JobResult::Deposit(TransferResult {
            user_id: UserId(42),
            amount: 1000,
            transaction_id: TransactionId("1-42-deposit-20240101-0000000000".to_string()),
        });

        let json = serde_json::to_value(&result).expect("result should serialize");
        assert_eq!(json["kind"], "DEPOSIT");
        assert_eq!(json["userId"], 42);
        assert_eq!(json["amount"], 1000);
        assert_eq!(json["transactionId"], "1-42-deposit-20240101-0000000000");
        assert_eq!(result.transaction_id().map(|t| t.as_str()), Some("1-42-deposit-20240101-0000000000"));
    }

    #[test]
    fn test_kind_display_matches_wire_names() {
        assert_eq!(JobKind::BalanceGet.to_string(), "BALANCE_GET");
        assert_eq!(serde_json::to_value(JobKind::Withdraw).unwrap(), "WITHDRAW");
    }
}
