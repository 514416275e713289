//! # Gamegate Server - WebSocket Front End for Wallet Jobs
//!
//! Accepts WebSocket clients and lets each one drive slow wallet operations
//! without ever blocking its own message loop.
//!
//! ## Architecture Overview
//!
//! ### Core Components
//!
//! * **Session** - Connection actor owning the socket, a reader pump, a
//!   writer pump, and the bounded frame buffers between them
//! * **Connection Manager** - Registry of live connections and their shutdown signals
//! * **Player** - Per-connection command dispatcher with its own job queue
//! * **GameServer** - Accept loop, connection limit, and server-wide shutdown
//!
//! ### Message Flow
//!
//! 1. The reader pump pushes each text or binary frame into the inbound buffer
//! 2. The command loop receives the frame and parses the `{cmd, data}` envelope
//! 3. Wallet work is submitted to the connection's job queue and awaited
//! 4. The reply is queued on the outbound buffer
//! 5. The writer pump writes it to the socket
//!
//! ## Shutdown
//!
//! Every session has one first-wins shutdown signal. A pump failure, an idle
//! timeout, a `close_server` command, or a server shutdown fires it; the
//! session's release logic then runs exactly once.
//!
//! ## Error Handling
//!
//! * [`SessionError`] - A session operation raced its shutdown
//! * [`ServerError`] - Network, protocol, and internal failures; any of them
//!   ends the affected connection only

pub use config::ServerConfig;
pub use error::{ServerError, SessionError};
pub use messaging::{ClientMessage, Command, CommandResponse, LoginData, PlayData};
pub use server::{handle_connection, serve_session, ConnectionContext, GameServer};
pub use session::{Frame, PumpExit, Session, SessionConfig, SessionTasks, ShutdownSignal};
pub use utils::{create_server, create_server_with_config};

pub mod config;
pub mod error;
pub mod messaging;
pub mod server;
pub mod session;
pub mod utils;

pub mod connection;
