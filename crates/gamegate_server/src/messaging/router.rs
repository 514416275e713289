//! Command dispatch for one connected player.
//!
//! Each connection owns a [`Player`]: the player's identity, their play
//! counter, and a dedicated job queue that talks to the wallet. Commands are
//! handled one at a time, in the order the client sent them.

use crate::error::ServerError;
use crate::messaging::types::{
    ClientMessage, Command, CommandResponse, LoginData, PlayData, CODE_WALLET_FAILED, CODE_WALLET_TIMEOUT,
};
use crate::session::Session;
use gamegate_jobs::{
    AwaitError, JobMeta, JobQueue, JobRequest, PlatformId, QueueError, TransactionIdGenerator, TransactionType,
    UserId,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

/// Points awarded for every round played.
const WIN_PER_PLAY: i64 = 10;

#[derive(Debug, thiserror::Error)]
enum LoginError {
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Await(#[from] AwaitError),
}

/// Per-connection state consulted by the command dispatcher.
pub struct Player {
    user_id: UserId,
    platform_id: PlatformId,
    play_count: u64,
    queue: JobQueue,
    transactions: Arc<TransactionIdGenerator>,
}

impl Player {
    /// Creates a player whose wallet jobs go through `queue`.
    ///
    /// The queue's worker must already be running for `login` to complete.
    pub fn new(
        user_id: UserId,
        platform_id: PlatformId,
        queue: JobQueue,
        transactions: Arc<TransactionIdGenerator>,
    ) -> Self {
        Self {
            user_id,
            platform_id,
            play_count: 0,
            queue,
            transactions,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn play_count(&self) -> u64 {
        self.play_count
    }

    /// Hands the job queue back, e.g. so its worker can drain and stop.
    pub fn into_queue(self) -> JobQueue {
        self.queue
    }

    fn meta(&self) -> JobMeta {
        JobMeta::new(self.platform_id, self.user_id)
    }

    /// Queries the wallet balance and deposits it into the game.
    async fn login(&self) -> Result<LoginData, LoginError> {
        let mut balance_job = self.queue.submit(self.meta(), JobRequest::BalanceGet).await?;
        let balance = self.queue.wait(&mut balance_job).await?;
        debug!("💰 User {} has balance {}", self.user_id, balance.amount());

        let transaction_id = self
            .transactions
            .make_id(self.platform_id, self.user_id, TransactionType::Deposit);
        let mut deposit_job = self
            .queue
            .submit(
                self.meta().with_transaction(transaction_id.clone()),
                JobRequest::Deposit {
                    amount: balance.amount(),
                },
            )
            .await?;
        let deposit = self.queue.wait(&mut deposit_job).await?;

        Ok(LoginData {
            user_id: self.user_id.0,
            balance: balance.amount(),
            amount: deposit.amount(),
            transaction_id: deposit
                .transaction_id()
                .unwrap_or(&transaction_id)
                .to_string(),
            job_id: deposit_job.job_id().0,
        })
    }

    fn play(&mut self) -> PlayData {
        self.play_count += 1;
        PlayData {
            user_id: self.user_id.0,
            win: WIN_PER_PLAY,
            play_cnt: self.play_count,
        }
    }
}

/// Handles one inbound frame for `player`.
///
/// # Returns
///
/// `Ok(())` when the command was handled (including wallet failures, which
/// are reported to the client), or a `ServerError` that must end the
/// connection: an unparseable frame, an unknown command, a closed session,
/// or a stopped job worker.
pub async fn route_client_message<S>(
    frame: &[u8],
    player: &mut Player,
    session: &Session<S>,
) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let message: ClientMessage =
        serde_json::from_slice(frame).map_err(|e| ServerError::Protocol(format!("Invalid message: {e}")))?;

    let command = Command::parse(&message.cmd)
        .ok_or_else(|| ServerError::Protocol(format!("Unknown command '{}'", message.cmd)))?;

    debug!("📨 {} from user {}: {}", command, player.user_id, message.data);

    match command {
        Command::Login => {
            let reply = match player.login().await {
                Ok(data) => encode(&CommandResponse::success(command, data))?,
                Err(LoginError::Queue(e)) => return Err(e.into()),
                Err(LoginError::Await(e)) => {
                    warn!("⚠️ Login for user {} failed: {}", player.user_id, e);
                    let code = match &e {
                        AwaitError::Timeout { .. } => CODE_WALLET_TIMEOUT,
                        _ => CODE_WALLET_FAILED,
                    };
                    encode(&CommandResponse::failure(command, code, e.to_string()))?
                }
            };
            session.send(reply).await?;
        }
        Command::Play => {
            let data = player.play();
            session.send(encode(&CommandResponse::success(command, data))?).await?;
        }
        Command::CloseServer => {
            info!("🛑 User {} asked to close the connection", player.user_id);
            session.shutdown();
        }
    }

    Ok(())
}

fn encode<T: Serialize>(response: &T) -> Result<Vec<u8>, ServerError> {
    serde_json::to_vec(response).map_err(|e| ServerError::Internal(format!("Failed to encode response: {e}")))
}
