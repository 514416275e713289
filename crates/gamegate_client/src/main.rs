//! # Gamegate Test Client
//!
//! Connects to a gamegate server, logs in, plays a few rounds and optionally
//! asks the server to close the session. Every reply is logged as it arrives.

use anyhow::{bail, Context};
use clap::Parser;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "gamegate-client")]
#[command(about = "Drives login and play commands against a gamegate server")]
struct Args {
    /// Server WebSocket URL
    #[arg(short, long, default_value = "ws://127.0.0.1:8080")]
    url: String,

    /// Number of play commands to send after login
    #[arg(short, long, default_value = "3")]
    plays: u32,

    /// Send close_server once all plays are answered
    #[arg(short, long)]
    close: bool,

    /// Seconds to wait for each reply
    #[arg(short, long, default_value = "15")]
    reply_timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    info!("🚀 Connecting to {}", args.url);

    let (ws_stream, _) = connect_async(args.url.as_str())
        .await
        .with_context(|| format!("failed to connect to {}", args.url))?;
    let (mut sender, mut receiver) = ws_stream.split();
    let reply_timeout = Duration::from_secs(args.reply_timeout);

    let mut commands = vec![json!({ "cmd": "login", "data": {} })];
    commands.extend((0..args.plays).map(|_| json!({ "cmd": "play", "data": {} })));

    for command in commands {
        sender.send(Message::text(command.to_string())).await?;

        let reply = timeout(reply_timeout, next_reply(&mut receiver))
            .await
            .with_context(|| format!("no reply to {} within {:?}", command["cmd"], reply_timeout))??;
        log_reply(&reply);
    }

    if args.close {
        info!("🛑 Asking the server to close the session");
        sender
            .send(Message::text(json!({ "cmd": "close_server", "data": {} }).to_string()))
            .await?;

        // The server drops the socket rather than replying.
        match timeout(reply_timeout, receiver.next()).await {
            Ok(None) | Ok(Some(Ok(Message::Close(_)))) | Ok(Some(Err(_))) => info!("✅ Session closed by server"),
            Ok(Some(Ok(other))) => warn!("Unexpected frame after close_server: {:?}", other),
            Err(_) => warn!("⏰ Server kept the session open"),
        }
    } else {
        let _ = sender.close().await;
    }

    info!("🏁 Client finished");
    Ok(())
}

/// Reads frames until a JSON reply arrives.
async fn next_reply<S>(receiver: &mut S) -> anyhow::Result<Value>
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(message) = receiver.next().await {
        match message? {
            Message::Text(text) => return Ok(serde_json::from_str(text.as_str())?),
            Message::Binary(bin) => return Ok(serde_json::from_slice(&bin)?),
            Message::Close(frame) => bail!("server closed the connection: {:?}", frame),
            _ => continue,
        }
    }
    bail!("server closed the connection")
}

fn log_reply(reply: &Value) {
    let cmd = reply["cmd"].as_str().unwrap_or("?");
    let code = reply["code"].as_i64().unwrap_or(-1);
    if code == 0 {
        info!("📨 {} ok: {}", cmd, reply["data"]);
    } else {
        warn!("📨 {} failed ({}): {}", cmd, code, reply["message"]);
    }
}
