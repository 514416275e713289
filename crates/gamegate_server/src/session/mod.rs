//! Per-connection actor owning one WebSocket and its two pumps.
//!
//! A [`Session`] splits the socket so that a reader pump and a writer pump
//! each own one half. Application code never touches the socket: it pulls
//! inbound frames with [`Session::receive`] and pushes outbound frames with
//! [`Session::send`], both backed by bounded FIFOs.
//!
//! ## Teardown
//!
//! Any pump exit, and any explicit [`Session::shutdown`], fires a single
//! shared [`ShutdownSignal`]. Everything blocked on the session observes it
//! and returns. [`Session::close`] then releases the socket and the buffers;
//! a lock-guarded flag makes that release run exactly once however many
//! pumps or callers ask for it.

mod pumps;
mod signal;

pub use signal::ShutdownSignal;

use crate::error::SessionError;
use futures::{FutureExt, SinkExt, StreamExt};
use futures_util::stream::{SplitSink, SplitStream};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn, Instrument, Span};

/// One discrete message unit, as raw bytes.
pub type Frame = Vec<u8>;

type WsSink<S> = SplitSink<WebSocketStream<S>, Message>;
type WsSource<S> = SplitStream<WebSocketStream<S>>;

/// Buffer sizes and deadlines of a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Capacity of the inbound frame FIFO
    pub inbound_buffer: usize,
    /// Capacity of the outbound frame FIFO
    pub outbound_buffer: usize,
    /// The reader gives up after this long without a frame from the peer
    pub idle_timeout: Duration,
    /// Bound on a single socket write, and on the close handshake
    pub write_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inbound_buffer: 1000,
            outbound_buffer: 1000,
            idle_timeout: Duration::from_secs(600),
            write_timeout: Duration::from_secs(10),
        }
    }
}

/// Why a pump stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PumpExit {
    /// The shutdown signal fired
    Shutdown,
    /// The peer sent a close frame or ended the stream
    PeerClosed,
    /// Nothing was read within the idle timeout
    IdleTimeout,
    /// Reading or writing the socket failed
    TransportError(String),
    /// The pump body panicked
    Panicked,
}

/// Socket half and channel ends that move into the pumps on `run`.
struct Unstarted<S> {
    stream: WsSource<S>,
    inbound_tx: mpsc::Sender<Frame>,
    outbound_rx: mpsc::Receiver<Frame>,
}

/// Connection actor for one client.
pub struct Session<S> {
    config: SessionConfig,
    sink: tokio::sync::Mutex<Option<WsSink<S>>>,
    unstarted: Mutex<Option<Unstarted<S>>>,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<Frame>>,
    outbound_tx: mpsc::Sender<Frame>,
    shutdown: ShutdownSignal,
    closed: Mutex<bool>,
    releases: AtomicUsize,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wraps an accepted WebSocket. Nothing runs until [`run`](Session::run).
    pub fn new(socket: WebSocketStream<S>, config: SessionConfig) -> Self {
        let (sink, stream) = socket.split();
        let (inbound_tx, inbound_rx) = mpsc::channel(config.inbound_buffer.max(1));
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_buffer.max(1));

        Self {
            config,
            sink: tokio::sync::Mutex::new(Some(sink)),
            unstarted: Mutex::new(Some(Unstarted {
                stream,
                inbound_tx,
                outbound_rx,
            })),
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            outbound_tx,
            shutdown: ShutdownSignal::new(),
            closed: Mutex::new(false),
            releases: AtomicUsize::new(0),
        }
    }

    /// Spawns the reader and writer pumps.
    ///
    /// Each pump runs under its own panic boundary and, whatever the reason
    /// it stops, fires shutdown and closes the session on its way out.
    ///
    /// # Returns
    ///
    /// The pump tasks, or [`SessionError::AlreadyRunning`] on a second call
    /// ([`SessionError::ConnectionClosed`] if the session was closed first).
    pub fn run(self: &Arc<Self>) -> Result<SessionTasks, SessionError> {
        let parts = self
            .unstarted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(Unstarted {
            stream,
            inbound_tx,
            outbound_rx,
        }) = parts
        else {
            return Err(if self.is_closed() {
                SessionError::ConnectionClosed
            } else {
                SessionError::AlreadyRunning
            });
        };

        let reader = self.spawn_pump("reader", pumps::read_loop(self.clone(), stream, inbound_tx));
        let writer = self.spawn_pump("writer", pumps::write_loop(self.clone(), outbound_rx));
        Ok(SessionTasks { reader, writer })
    }

    fn spawn_pump<F>(self: &Arc<Self>, name: &'static str, pump: F) -> JoinHandle<PumpExit>
    where
        F: Future<Output = PumpExit> + Send + 'static,
    {
        let session = self.clone();
        tokio::spawn(
            async move {
                let exit = match AssertUnwindSafe(pump).catch_unwind().await {
                    Ok(exit) => exit,
                    Err(_) => {
                        error!("💥 Session {} pump panicked", name);
                        PumpExit::Panicked
                    }
                };
                debug!("🔚 Session {} pump stopped: {:?}", name, exit);

                session.shutdown();
                session.close().await;
                exit
            }
            .instrument(Span::current()),
        )
    }

    /// Waits for the next inbound frame.
    ///
    /// Fails with [`SessionError::ConnectionClosed`] once shutdown has fired,
    /// even if frames are still buffered.
    pub async fn receive(&self) -> Result<Frame, SessionError> {
        tokio::select! {
            biased;
            _ = self.shutdown.fired() => Err(SessionError::ConnectionClosed),
            frame = async { self.inbound_rx.lock().await.recv().await } => {
                frame.ok_or(SessionError::ConnectionClosed)
            }
        }
    }

    /// Queues a frame for the writer, waiting while the outbound FIFO is full.
    ///
    /// Blocked senders are admitted in the order they started waiting.
    pub async fn send(&self, frame: Frame) -> Result<(), SessionError> {
        tokio::select! {
            biased;
            _ = self.shutdown.fired() => Err(SessionError::ConnectionClosed),
            sent = self.outbound_tx.send(frame) => sent.map_err(|_| SessionError::ConnectionClosed),
        }
    }

    /// Fires the shutdown signal. Returns `true` only for the call that fired it.
    pub fn shutdown(&self) -> bool {
        let fired = self.shutdown.fire();
        if fired {
            debug!("🛑 Session shutdown requested");
        }
        fired
    }

    /// Releases the socket and buffers. Runs its body at most once.
    pub async fn close(&self) {
        if !self.mark_closed() {
            return;
        }
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.shutdown.fire();

        // Never started: the read half and the channel ends are still parked here.
        let unstarted = self
            .unstarted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(unstarted);

        let sink = self.sink.lock().await.take();
        if let Some(mut sink) = sink {
            match tokio::time::timeout(self.config.write_timeout, sink.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!("Close handshake failed: {}", e),
                Err(_) => warn!("⏰ Close handshake timed out"),
            }
        }

        let mut inbound = self.inbound_rx.lock().await;
        inbound.close();
        let mut discarded = 0usize;
        while inbound.try_recv().is_ok() {
            discarded += 1;
        }
        drop(inbound);

        info!("🔌 Session closed ({} unread frames discarded)", discarded);
    }

    fn mark_closed(&self) -> bool {
        let mut closed = self.closed.lock().unwrap_or_else(PoisonError::into_inner);
        if *closed {
            false
        } else {
            *closed = true;
            true
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_fired()
    }

    /// How many times the release logic in [`close`](Session::close) ran (0 or 1).
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// A clone of the session's shutdown signal, for registries that need to
    /// stop the session from outside.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }
}

/// The two spawned pumps of a running session.
pub struct SessionTasks {
    reader: JoinHandle<PumpExit>,
    writer: JoinHandle<PumpExit>,
}

impl SessionTasks {
    /// Waits for both pumps and returns `(reader, writer)` exits.
    pub async fn join(self) -> (PumpExit, PumpExit) {
        let reader = self.reader.await.unwrap_or(PumpExit::Panicked);
        let writer = self.writer.await.unwrap_or(PumpExit::Panicked);
        (reader, writer)
    }
}
