//! Message transports.
//!
//! A connection handler only ever sees two halves: a [`FrameReader`] that
//! yields decoded [`ClientMessage`]s and a [`FrameWriter`] that sends
//! [`ServerMessage`]s.  Two implementations exist:
//!
//! | transport  | reader / writer             | framing                          |
//! |------------|-----------------------------|----------------------------------|
//! | raw TCP    | [`LineReader`]/[`LineWriter`] | one JSON object per `\n` line  |
//! | WebSocket  | [`WsReader`]/[`WsWriter`]     | one JSON object per text frame |
//!
//! A frame that fails to decode is reported as [`TransportError::Protocol`],
//! which is not fatal: the handler answers with an `invalid_message` error
//! and keeps reading.  Every other error ends the connection, including a
//! line that runs past [`MAX_FRAME_LEN`] before its newline.
//!
//! [`MAX_FRAME_LEN`]: othello_core::protocol::codec::MAX_FRAME_LEN

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use othello_core::{
    decode_client_message, encode_line, scan_line, ClientMessage, ProtocolError, ServerMessage,
};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::WebSocketStream;

/// Errors raised by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The peer or the local writer task went away.
    #[error("connection closed")]
    Closed,
}

impl TransportError {
    /// `false` only for per-frame decode errors; the stream is still usable.
    /// An oversized frame is fatal since the reader stopped mid-line.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            TransportError::Protocol(e) if !matches!(e, ProtocolError::FrameTooLarge { .. })
        )
    }
}

/// Receiving half of a transport.
#[async_trait]
pub trait FrameReader: Send {
    /// Returns the next client message, or `Ok(None)` when the peer closed
    /// the connection cleanly.
    async fn next_message(&mut self) -> Result<Option<ClientMessage>, TransportError>;
}

/// Sending half of a transport.
#[async_trait]
pub trait FrameWriter: Send {
    async fn send(&mut self, message: &ServerMessage) -> Result<(), TransportError>;
}

// ── Newline-delimited JSON ────────────────────────────────────────────────────

/// Reads newline-delimited JSON messages.  Blank lines are skipped.
///
/// At most [`MAX_FRAME_LEN`](othello_core::protocol::codec::MAX_FRAME_LEN)
/// bytes of one line are buffered.
pub struct LineReader<R> {
    inner: BufReader<R>,
    frame: Vec<u8>,
}

impl<R: AsyncRead + Unpin + Send> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            frame: Vec::new(),
        }
    }

    /// Fills `self.frame` with the next line.  `Ok(false)` on EOF with
    /// nothing buffered; a final line without a newline still counts.
    async fn read_frame(&mut self) -> Result<bool, TransportError> {
        self.frame.clear();
        loop {
            let chunk = self.inner.fill_buf().await?;
            if chunk.is_empty() {
                return Ok(!self.frame.is_empty());
            }
            let (used, complete) = scan_line(&mut self.frame, chunk)?;
            self.inner.consume(used);
            if complete {
                return Ok(true);
            }
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> FrameReader for LineReader<R> {
    async fn next_message(&mut self) -> Result<Option<ClientMessage>, TransportError> {
        while self.read_frame().await? {
            let line = String::from_utf8_lossy(&self.frame);
            if line.trim().is_empty() {
                continue;
            }
            return Ok(Some(decode_client_message(&line)?));
        }
        Ok(None)
    }
}

/// Writes each message as one JSON line and flushes it.
pub struct LineWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin + Send> LineWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> FrameWriter for LineWriter<W> {
    async fn send(&mut self, message: &ServerMessage) -> Result<(), TransportError> {
        let line = encode_line(message)?;
        self.inner.write_all(line.as_bytes()).await?;
        self.inner.flush().await?;
        Ok(())
    }
}

/// Splits a TCP stream into a line reader and a line writer.
pub fn split_tcp(stream: TcpStream) -> (LineReader<OwnedReadHalf>, LineWriter<OwnedWriteHalf>) {
    let (read_half, write_half) = stream.into_split();
    (LineReader::new(read_half), LineWriter::new(write_half))
}

// ── WebSocket ─────────────────────────────────────────────────────────────────

/// Reads one JSON message per WebSocket text frame.
///
/// Ping and pong frames are skipped; tungstenite answers pings itself.
/// A close frame ends the stream.
pub struct WsReader<S> {
    stream: SplitStream<WebSocketStream<S>>,
}

/// Sends one JSON message per WebSocket text frame.
pub struct WsWriter<S> {
    sink: SplitSink<WebSocketStream<S>, WsMessage>,
}

/// Splits an upgraded WebSocket into a reader and a writer.
pub fn split_ws<S>(ws: WebSocketStream<S>) -> (WsReader<S>, WsWriter<S>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let (sink, stream) = ws.split();
    (WsReader { stream }, WsWriter { sink })
}

#[async_trait]
impl<S> FrameReader for WsReader<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn next_message(&mut self) -> Result<Option<ClientMessage>, TransportError> {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => return Ok(Some(decode_client_message(&text)?)),
                Ok(WsMessage::Binary(bytes)) => {
                    // Accept UTF-8 JSON in binary frames too.
                    let text = String::from_utf8_lossy(&bytes);
                    return Ok(Some(decode_client_message(&text)?));
                }
                Ok(WsMessage::Close(_)) => return Ok(None),
                Ok(_) => continue,
                Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl<S> FrameWriter for WsWriter<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, message: &ServerMessage) -> Result<(), TransportError> {
        let json = serde_json::to_string(message).map_err(ProtocolError::from)?;
        self.sink.send(WsMessage::Text(json)).await?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
