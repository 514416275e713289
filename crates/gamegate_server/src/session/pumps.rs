//! Reader and writer loops of a session.

use super::{Frame, PumpExit, Session, WsSource};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace};

/// Moves frames from the socket into the inbound FIFO.
pub(super) async fn read_loop<S>(
    session: Arc<Session<S>>,
    mut stream: WsSource<S>,
    inbound: mpsc::Sender<Frame>,
) -> PumpExit
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let idle_timeout = session.config.idle_timeout;

    loop {
        let next = tokio::select! {
            biased;
            _ = session.shutdown.fired() => return PumpExit::Shutdown,
            next = timeout(idle_timeout, stream.next()) => next,
        };

        let frame = match next {
            Err(_) => {
                info!("⏰ No frame from peer for {:?}, closing", idle_timeout);
                return PumpExit::IdleTimeout;
            }
            Ok(None) => return PumpExit::PeerClosed,
            Ok(Some(Err(e))) => {
                debug!("WebSocket read failed: {}", e);
                return PumpExit::TransportError(e.to_string());
            }
            Ok(Some(Ok(message))) => match message {
                Message::Text(text) => text.as_str().as_bytes().to_vec(),
                Message::Binary(data) => data.to_vec(),
                Message::Close(_) => {
                    debug!("🔌 Peer requested close");
                    return PumpExit::PeerClosed;
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            },
        };

        let len = frame.len();
        tokio::select! {
            biased;
            _ = session.shutdown.fired() => {
                trace!("Dropping inbound frame of {} bytes: session is shutting down", len);
                return PumpExit::Shutdown;
            }
            sent = inbound.send(frame) => {
                if sent.is_err() {
                    return PumpExit::Shutdown;
                }
            }
        }
    }
}

/// Moves frames from the outbound FIFO onto the socket.
pub(super) async fn write_loop<S>(session: Arc<Session<S>>, mut outbound: mpsc::Receiver<Frame>) -> PumpExit
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let write_timeout = session.config.write_timeout;

    loop {
        let frame = tokio::select! {
            biased;
            _ = session.shutdown.fired() => return PumpExit::Shutdown,
            frame = outbound.recv() => match frame {
                Some(frame) => frame,
                None => return PumpExit::Shutdown,
            },
        };

        let message = match String::from_utf8(frame) {
            Ok(text) => Message::text(text),
            Err(e) => Message::binary(e.into_bytes()),
        };

        let mut guard = session.sink.lock().await;
        let Some(sink) = guard.as_mut() else {
            return PumpExit::Shutdown;
        };

        match timeout(write_timeout, sink.send(message)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!("WebSocket write failed: {}", e);
                return PumpExit::TransportError(e.to_string());
            }
            Err(_) => {
                return PumpExit::TransportError(format!("write timed out after {write_timeout:?}"));
            }
        }
    }
}
