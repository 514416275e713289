//! Connection handling logic for WebSocket clients.
//!
//! This module contains the logic that manages the lifecycle of individual
//! client connections: handshake, registration, the command loop, and the
//! ordered teardown of the session and its job queue.

use crate::{
    config::ServerConfig,
    connection::ConnectionManager,
    error::ServerError,
    messaging::{route_client_message, Player},
    session::Session,
};
use gamegate_jobs::{JobQueue, TransactionIdGenerator, UserId, WalletBackend};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::accept_async;
use tracing::{debug, info, warn};

/// Server-wide state every connection handler needs.
#[derive(Clone)]
pub struct ConnectionContext {
    pub config: Arc<ServerConfig>,
    pub connections: Arc<ConnectionManager>,
    pub transactions: Arc<TransactionIdGenerator>,
    pub wallet: Arc<dyn WalletBackend>,
}

/// Handles a single client connection from handshake to cleanup.
///
/// # Connection Flow
///
/// 1. Perform WebSocket handshake
/// 2. Wrap the socket in a [`Session`] and hand it to [`serve_session`]
///
/// # Arguments
///
/// * `stream` - The transport for the client connection
/// * `addr` - The remote address of the client
/// * `ctx` - Shared server state
///
/// # Returns
///
/// `Ok(())` if the connection ended normally, or a `ServerError` if the
/// handshake failed or the client broke the command protocol.
pub async fn handle_connection<S>(stream: S, addr: SocketAddr, ctx: ConnectionContext) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let ws_stream = accept_async(stream)
        .await
        .map_err(|e| ServerError::Network(format!("WebSocket handshake failed: {e}")))?;

    let session = Arc::new(Session::new(ws_stream, ctx.config.session_config()));
    serve_session(session, addr, ctx).await
}

/// Runs the command loop of an already-handshaken session.
///
/// The user id is the client's remote port until real authentication
/// exists. A dedicated job queue is started for the connection and stopped
/// with it.
///
/// The session is always shut down and closed before this returns, and the
/// connection is always unregistered.
pub async fn serve_session<S>(session: Arc<Session<S>>, addr: SocketAddr, ctx: ConnectionContext) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let queue = JobQueue::new(ctx.config.queue_config(), ctx.wallet.clone());
    let worker = queue.run()?;

    let user_id = UserId(i64::from(addr.port()));
    let connection_id = ctx
        .connections
        .add_connection(addr, session.shutdown_signal())
        .await;
    ctx.connections.set_user_id(connection_id, user_id).await;

    let mut player = Player::new(user_id, ctx.config.platform(), queue, ctx.transactions.clone());

    let result = match session.run() {
        Ok(tasks) => {
            info!("✅ User {} connected from {}", user_id, addr);
            let result = command_loop(&session, &mut player).await;

            session.shutdown();
            session.close().await;
            let (reader, writer) = tasks.join().await;
            debug!("Pumps for user {} exited: reader={:?}, writer={:?}", user_id, reader, writer);
            result
        }
        Err(e) => {
            session.shutdown();
            session.close().await;
            Err(e.into())
        }
    };

    ctx.connections.remove_connection(connection_id).await;
    info!("👋 User {} disconnected after {} plays", user_id, player.play_count());

    // Dropping the queue lets the worker finish whatever is left and stop.
    drop(player.into_queue());
    match worker.await {
        Ok(report) => debug!("Job worker for user {} finished: {:?}", user_id, report),
        Err(e) => warn!("Job worker for user {} ended abnormally: {}", user_id, e),
    }

    result
}

async fn command_loop<S>(session: &Session<S>, player: &mut Player) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    loop {
        let frame = match session.receive().await {
            Ok(frame) => frame,
            Err(_) => return Ok(()),
        };

        match route_client_message(&frame, player, session).await {
            Ok(()) => {}
            Err(ServerError::Network(_)) if session.is_shutdown() => return Ok(()),
            Err(e) => return Err(e),
        }
    }
}
