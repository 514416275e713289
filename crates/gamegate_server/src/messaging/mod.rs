//! Message handling and routing for client-server communication.
//!
//! This module provides the command envelope, the response payloads, and the
//! per-connection dispatcher that turns commands into wallet jobs.

pub mod router;
pub mod types;

pub use router::{route_client_message, Player};
pub use types::{ClientMessage, Command, CommandResponse, LoginData, PlayData};
