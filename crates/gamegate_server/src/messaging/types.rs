//! Message type definitions for client-server communication.
//!
//! Every inbound frame is a JSON envelope naming a command and carrying a
//! payload; every reply wraps its payload with a status code and message.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reply code for a command that succeeded.
pub const CODE_SUCCESS: i32 = 0;

/// Reply code when the wallet did not answer in time.
pub const CODE_WALLET_TIMEOUT: i32 = 1001;

/// Reply code when the wallet answered with a failure.
pub const CODE_WALLET_FAILED: i32 = 1002;

/// A message sent from a client to the server.
///
/// Both fields are required; a frame missing either is a protocol violation.
///
/// ```json
/// { "cmd": "login", "data": {} }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientMessage {
    /// The command name (`login`, `play`, `close_server`)
    pub cmd: String,

    /// The command payload as a JSON value
    pub data: serde_json::Value,
}

/// The commands a client can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Query the wallet balance, then deposit it into the game
    Login,
    /// Play one round
    Play,
    /// Ask the server to drop this connection
    CloseServer,
}

impl Command {
    /// Parses a wire command name.
    pub fn parse(cmd: &str) -> Option<Self> {
        match cmd {
            "login" => Some(Command::Login),
            "play" => Some(Command::Play),
            "close_server" => Some(Command::CloseServer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Login => "login",
            Command::Play => "play",
            Command::CloseServer => "close_server",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reply sent from the server to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse<T> {
    pub cmd: String,
    pub code: i32,
    pub message: String,
    pub data: T,
}

impl<T> CommandResponse<T> {
    pub fn success(cmd: Command, data: T) -> Self {
        Self {
            cmd: cmd.to_string(),
            code: CODE_SUCCESS,
            message: "success".to_string(),
            data,
        }
    }
}

impl CommandResponse<serde_json::Value> {
    /// A failure reply with an empty payload.
    pub fn failure(cmd: Command, code: i32, message: impl Into<String>) -> Self {
        Self {
            cmd: cmd.to_string(),
            code,
            message: message.into(),
            data: serde_json::Value::Null,
        }
    }
}

/// Payload of a successful `login` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub user_id: i64,
    /// Balance reported by the wallet before the deposit
    pub balance: i64,
    /// Amount moved into the game
    pub amount: i64,
    pub transaction_id: String,
    /// Id of the deposit job
    pub job_id: u64,
}

/// Payload of a `play` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayData {
    pub user_id: i64,
    pub win: i64,
    pub play_cnt: u64,
}
