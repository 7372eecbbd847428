//! Network bindings for the client application.
//!
//! Both bindings speak newline-delimited JSON over TCP and report what the
//! server says as [`NetworkEvent`]s on an unbounded channel.
//!
//! - [`PushClient`]: one reader task forwards every line the server sends.
//!   Requests are written straight to the socket.
//! - [`PollClient`]: strict request/response.  Requests and the background
//!   `get_state` loop share one connection behind a mutex, so each reply is
//!   matched with its request.  Identical consecutive poll results are
//!   forwarded once.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use async_trait::async_trait;
use othello_core::{
    decode_server_message, encode_line, scan_line, ClientMessage, ProtocolError, ServerMessage,
};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::{GameClient, SendError};

/// Errors that can occur in the client network layer.
#[derive(Debug, Error)]
pub enum ClientNetworkError {
    #[error("failed to connect to server at {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("connection closed by server")]
    Closed,
}

impl From<ClientNetworkError> for SendError {
    fn from(e: ClientNetworkError) -> Self {
        match e {
            ClientNetworkError::Closed => SendError::Closed,
            other => SendError::Transport(other.to_string()),
        }
    }
}

/// Events emitted by the network layer to the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    /// A message (event or reply) from the server.
    Message(ServerMessage),
    /// The connection is gone; no further events follow.
    Disconnected,
}

type LineReader = BufReader<OwnedReadHalf>;

async fn open(addr: SocketAddr) -> Result<(LineReader, OwnedWriteHalf), ClientNetworkError> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|source| ClientNetworkError::ConnectFailed { addr, source })?;
    if let Err(e) = stream.set_nodelay(true) {
        debug!("could not disable Nagle: {e}");
    }
    info!("connected to server at {addr}");
    let (read_half, write_half) = stream.into_split();
    Ok((BufReader::new(read_half), write_half))
}

/// Reads one line into `frame`, buffering at most the frame limit.
/// `Ok(false)` on EOF with nothing buffered.
async fn read_frame<R>(reader: &mut R, frame: &mut Vec<u8>) -> Result<bool, ClientNetworkError>
where
    R: AsyncBufRead + Unpin,
{
    frame.clear();
    loop {
        let chunk = reader.fill_buf().await?;
        if chunk.is_empty() {
            return Ok(!frame.is_empty());
        }
        let (used, complete) = scan_line(frame, chunk)?;
        reader.consume(used);
        if complete {
            return Ok(true);
        }
    }
}

/// Reads the next non-blank line and decodes it.  `Ok(None)` on EOF.
async fn next_message<R>(reader: &mut R) -> Result<Option<ServerMessage>, ClientNetworkError>
where
    R: AsyncBufRead + Unpin,
{
    let mut frame = Vec::new();
    while read_frame(reader, &mut frame).await? {
        let line = String::from_utf8_lossy(&frame);
        if line.trim().is_empty() {
            continue;
        }
        return Ok(Some(decode_server_message(&line)?));
    }
    Ok(None)
}

async fn write_message(writer: &mut OwnedWriteHalf, msg: &ClientMessage) -> Result<(), ClientNetworkError> {
    let line = encode_line(msg)?;
    writer.write_all(line.as_bytes()).await?;
    Ok(())
}

fn connect_message(game_id: &str, name: &str) -> ClientMessage {
    ClientMessage::Connect {
        game_id: Some(game_id.to_string()),
        player_name: Some(name.to_string()),
    }
}

// ── Push binding ──────────────────────────────────────────────────────────────

/// Client for the push binding.
pub struct PushClient {
    writer: Mutex<OwnedWriteHalf>,
}

impl PushClient {
    /// Connects, sends `connect` and starts forwarding server messages.
    ///
    /// The `connected` reply (or an error such as `room_full`) arrives as the
    /// first event on the returned channel.
    pub async fn connect(
        addr: SocketAddr,
        game_id: &str,
        name: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<NetworkEvent>), ClientNetworkError> {
        let (reader, mut writer) = open(addr).await?;
        write_message(&mut writer, &connect_message(game_id, name)).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(forward_pushed(reader, tx));
        Ok((
            Self {
                writer: Mutex::new(writer),
            },
            rx,
        ))
    }
}

async fn forward_pushed(mut reader: LineReader, tx: mpsc::UnboundedSender<NetworkEvent>) {
    loop {
        match next_message(&mut reader).await {
            Ok(Some(msg)) => {
                debug!("received {}", msg.type_name());
                if tx.send(NetworkEvent::Message(msg)).is_err() {
                    return;
                }
            }
            Ok(None) => {
                info!("server closed the connection");
                break;
            }
            Err(ClientNetworkError::Protocol(e)) if !matches!(e, ProtocolError::FrameTooLarge { .. }) => {
                warn!("ignoring undecodable line: {e}")
            }
            Err(e) => {
                warn!("read error: {e}");
                break;
            }
        }
    }
    let _ = tx.send(NetworkEvent::Disconnected);
}

#[async_trait]
impl GameClient for PushClient {
    async fn send(&self, msg: &ClientMessage) -> Result<(), SendError> {
        let mut writer = self.writer.lock().await;
        write_message(&mut writer, msg).await?;
        Ok(())
    }
}

// ── Poll binding ──────────────────────────────────────────────────────────────

struct PollConnection {
    reader: LineReader,
    writer: OwnedWriteHalf,
}

/// Client for the poll binding.
pub struct PollClient {
    conn: Mutex<PollConnection>,
    events: mpsc::UnboundedSender<NetworkEvent>,
}

impl PollClient {
    /// Connects and sends `connect`.  The reply is the first event on the
    /// returned channel.  Call [`PollClient::spawn_poll_loop`] to start
    /// receiving game events.
    pub async fn connect(
        addr: SocketAddr,
        game_id: &str,
        name: &str,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<NetworkEvent>), ClientNetworkError> {
        let (reader, writer) = open(addr).await?;
        let (tx, rx) = mpsc::unbounded_channel();
        let client = Arc::new(Self {
            conn: Mutex::new(PollConnection { reader, writer }),
            events: tx,
        });
        let reply = client.request(&connect_message(game_id, name)).await?;
        let _ = client.events.send(NetworkEvent::Message(reply));
        Ok((client, rx))
    }

    /// Sends `msg` and waits for its reply.
    ///
    /// # Errors
    ///
    /// [`ClientNetworkError::Closed`] if the server hung up before replying.
    pub async fn request(&self, msg: &ClientMessage) -> Result<ServerMessage, ClientNetworkError> {
        let mut conn = self.conn.lock().await;
        write_message(&mut conn.writer, msg).await?;
        next_message(&mut conn.reader)
            .await?
            .ok_or(ClientNetworkError::Closed)
    }

    /// Polls `get_state` every `interval` until `running` is cleared or the
    /// connection fails.  Ends with [`NetworkEvent::Disconnected`] on failure.
    pub fn spawn_poll_loop(
        self: &Arc<Self>,
        interval: Duration,
        running: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut last: Option<ServerMessage> = None;
            while running.load(Ordering::Relaxed) {
                match this.request(&ClientMessage::GetState).await {
                    Ok(msg) => {
                        if last.as_ref() != Some(&msg) {
                            if this.events.send(NetworkEvent::Message(msg.clone())).is_err() {
                                return;
                            }
                            last = Some(msg);
                        }
                    }
                    Err(e) => {
                        warn!("poll failed: {e}");
                        let _ = this.events.send(NetworkEvent::Disconnected);
                        return;
                    }
                }
                tokio::time::sleep(interval).await;
            }
        })
    }
}

#[async_trait]
impl GameClient for PollClient {
    async fn send(&self, msg: &ClientMessage) -> Result<(), SendError> {
        let reply = self.request(msg).await?;
        let _ = self.events.send(NetworkEvent::Message(reply));
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
