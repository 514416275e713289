//! The external wallet service the job worker talks to.
//!
//! [`WalletBackend`] is the seam between the queue and the third-party
//! platform. The only implementation shipped here is [`SimulatedWallet`],
//! which answers every request with a fixed amount after a fixed delay.

use crate::error::WalletError;
use crate::types::{BalanceResult, JobKind, JobMeta, TransferResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Operations offered by a third-party wallet platform.
#[async_trait]
pub trait WalletBackend: Send + Sync {
    /// Returns the user's balance on the platform.
    async fn balance(&self, meta: &JobMeta) -> Result<BalanceResult, WalletError>;

    /// Moves `amount` from the platform wallet into the game.
    async fn deposit(&self, meta: &JobMeta, amount: i64) -> Result<TransferResult, WalletError>;

    /// Moves `amount` from the game back to the platform wallet.
    async fn withdraw(&self, meta: &JobMeta, amount: i64) -> Result<TransferResult, WalletError> {
        let _ = (meta, amount);
        Err(WalletError::Unsupported(JobKind::Withdraw))
    }
}

fn default_balance_delay_ms() -> u64 {
    1000
}

fn default_deposit_delay_ms() -> u64 {
    3000
}

fn default_simulated_amount() -> i64 {
    1000
}

/// Latencies and fixed answers of the simulated wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Simulated latency of a balance query in milliseconds
    #[serde(default = "default_balance_delay_ms")]
    pub balance_delay_ms: u64,

    /// Simulated latency of a deposit in milliseconds
    #[serde(default = "default_deposit_delay_ms")]
    pub deposit_delay_ms: u64,

    /// Balance reported for every user
    #[serde(default = "default_simulated_amount")]
    pub simulated_amount: i64,
}

impl WalletConfig {
    /// A wallet that answers immediately, for tests and demos.
    pub fn instant() -> Self {
        Self {
            balance_delay_ms: 0,
            deposit_delay_ms: 0,
            ..Self::default()
        }
    }

    pub fn balance_delay(&self) -> Duration {
        Duration::from_millis(self.balance_delay_ms)
    }

    pub fn deposit_delay(&self) -> Duration {
        Duration::from_millis(self.deposit_delay_ms)
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            balance_delay_ms: default_balance_delay_ms(),
            deposit_delay_ms: default_deposit_delay_ms(),
            simulated_amount: default_simulated_amount(),
        }
    }
}

/// Stand-in for the third-party wallet: fixed delays, fixed amounts.
#[derive(Debug, Clone, Default)]
pub struct SimulatedWallet {
    config: WalletConfig,
}

impl SimulatedWallet {
    pub fn new(config: WalletConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl WalletBackend for SimulatedWallet {
    async fn balance(&self, meta: &JobMeta) -> Result<BalanceResult, WalletError> {
        debug!(
            "💰 Querying wallet balance for user {} on platform {} ({}ms simulated)",
            meta.user_id, meta.platform_id, self.config.balance_delay_ms
        );
        tokio::time::sleep(self.config.balance_delay()).await;

        Ok(BalanceResult {
            user_id: meta.user_id,
            amount: self.config.simulated_amount,
        })
    }

    async fn deposit(&self, meta: &JobMeta, amount: i64) -> Result<TransferResult, WalletError> {
        let transaction_id = meta
            .transaction_id
            .clone()
            .ok_or(WalletError::MissingTransaction(JobKind::Deposit))?;

        info!(
            "💸 Depositing {} for user {} (transaction {}, {}ms simulated)",
            amount, meta.user_id, transaction_id, self.config.deposit_delay_ms
        );
        tokio::time::sleep(self.config.deposit_delay()).await;

        Ok(TransferResult {
            user_id: meta.user_id,
            amount,
            transaction_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PlatformId, TransactionId, UserId};

    #[test]
    fn test_wallet_config_defaults() {
        let config = WalletConfig::default();
        assert_eq!(config.balance_delay(), Duration::from_secs(1));
        assert_eq!(config.deposit_delay(), Duration::from_secs(3));
        assert_eq!(config.simulated_amount, 1000);
    }

    #[tokio::test]
    async fn test_deposit_requires_transaction_id() {
        let wallet = SimulatedWallet::new(WalletConfig::instant());
        let meta = JobMeta::new(PlatformId(1), UserId(42));

        let err = wallet.deposit(&meta, 1000).await.expect_err("no transaction id");
        assert_eq!(err, WalletError::MissingTransaction(JobKind::Deposit));

        let meta = meta.with_transaction(TransactionId("tx-1".to_string()));
        let transfer = wallet.deposit(&meta, 250).await.expect("deposit succeeds");
        assert_eq!(transfer.amount, 250);
        assert_eq!(transfer.transaction_id.as_str(), "tx-1");
    }

    #[tokio::test]
    async fn test_withdraw_is_unsupported() {
        let wallet = SimulatedWallet::default();
        let meta = JobMeta::new(PlatformId(1), UserId(42));
        let err = wallet.withdraw(&meta, 10).await.expect_err("withdraw is a stub");
        assert_eq!(err, WalletError::Unsupported(JobKind::Withdraw));
    }
}
