//! Transaction ids for wallet transfers.
//!
//! Ids have the shape `{platform}-{user}-{type}-{YYYYMMDD}-{sequence}` where
//! the sequence is a zero-padded, ten digit counter shared by every id the
//! generator produces.

use crate::types::{PlatformId, TransactionId, UserId};
use chrono::NaiveDate;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Direction of a wallet transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionType {
    Deposit,
    Withdraw,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdraw => "withdraw",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produces transaction ids with a process-wide monotonically increasing sequence.
///
/// One generator is shared by all connections of a server so that no two
/// transfers ever receive the same id.
#[derive(Debug, Default)]
pub struct TransactionIdGenerator {
    next_sequence: Mutex<u64>,
}

impl TransactionIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a generator whose first id uses `sequence`.
    pub fn starting_at(sequence: u64) -> Self {
        Self {
            next_sequence: Mutex::new(sequence),
        }
    }

    /// Builds the next id, stamped with today's local date.
    pub fn make_id(&self, platform_id: PlatformId, user_id: UserId, kind: TransactionType) -> TransactionId {
        self.make_id_on(platform_id, user_id, kind, chrono::Local::now().date_naive())
    }

    /// Builds the next id for an explicit date.
    pub fn make_id_on(
        &self,
        platform_id: PlatformId,
        user_id: UserId,
        kind: TransactionType,
        date: NaiveDate,
    ) -> TransactionId {
        let mut next = self
            .next_sequence
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let sequence = *next;
        *next += 1;
        drop(next);

        TransactionId(format!(
            "{}-{}-{}-{}-{:010}",
            platform_id,
            user_id,
            kind,
            date.format("%Y%m%d"),
            sequence
        ))
    }
}
