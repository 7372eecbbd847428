//! Shared helpers for the server integration tests.
//!
//! Each test starts its own server on ephemeral loopback ports and talks to
//! it over real sockets with newline-delimited JSON.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{atomic::AtomicBool, Arc};
use std::time::Duration;

use othello_core::{decode_server_message, ServerMessage};
use othello_server::application::SessionRegistry;
use othello_server::infrastructure::{bind_listeners, serve, ServerConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// How long a test waits for an expected message.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(3);

/// How long a test waits before concluding nothing else is coming.
pub const QUIET_PERIOD: Duration = Duration::from_millis(150);

pub struct TestServer {
    pub push: SocketAddr,
    pub poll: SocketAddr,
    pub ws: SocketAddr,
    pub registry: Arc<SessionRegistry>,
    pub running: Arc<AtomicBool>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.running
            .store(false, std::sync::atomic::Ordering::Relaxed);
    }
}

/// Binds all three listeners on 127.0.0.1 with OS-assigned ports and serves
/// them in the background.
pub async fn start_server() -> TestServer {
    let config = ServerConfig {
        bind_address: "127.0.0.1".to_string(),
        port: 0,
        poll_port: 0,
        ws_port: 0,
        ..ServerConfig::default()
    };
    let listeners = bind_listeners(&config).await.expect("bind listeners");
    let push = listeners.push_addr().expect("push addr");
    let poll = listeners.poll_addr().expect("poll addr");
    let ws = listeners.ws_addr().expect("ws addr");

    let registry = Arc::new(SessionRegistry::new());
    let running = Arc::new(AtomicBool::new(true));
    tokio::spawn(serve(
        listeners,
        Arc::clone(&registry),
        Arc::new(config),
        Arc::clone(&running),
    ));

    TestServer {
        push,
        poll,
        ws,
        registry,
        running,
    }
}

/// A raw newline-delimited JSON client.
pub struct LineClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl LineClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("tcp connect");
        let (read_half, writer) = stream.into_split();
        Self {
            lines: BufReader::new(read_half).lines(),
            writer,
        }
    }

    /// Sends one raw JSON line.
    pub async fn send(&mut self, json: &str) {
        self.writer
            .write_all(format!("{json}\n").as_bytes())
            .await
            .expect("write");
    }

    /// Writes `bytes` as-is.  Write errors are ignored, since the server
    /// may hang up part way through.
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        let _ = self.writer.write_all(bytes).await;
    }

    /// Waits for the server to close the connection.
    pub async fn assert_closed(&mut self) {
        match timeout(RECV_TIMEOUT, self.lines.next_line()).await {
            Ok(Ok(None)) | Ok(Err(_)) => {}
            Ok(Ok(Some(line))) => panic!("expected the connection to close, got {line}"),
            Err(_) => panic!("timed out waiting for the connection to close"),
        }
    }

    /// Waits for the next server message.
    pub async fn recv(&mut self) -> ServerMessage {
        let line = timeout(RECV_TIMEOUT, self.lines.next_line())
            .await
            .expect("timed out waiting for a server message")
            .expect("read error")
            .expect("server closed the connection");
        decode_server_message(&line).expect("server sent invalid JSON")
    }

    /// Sends `json` and returns the next message (poll binding).
    pub async fn request(&mut self, json: &str) -> ServerMessage {
        self.send(json).await;
        self.recv().await
    }

    /// Asserts nothing arrives within [`QUIET_PERIOD`].
    pub async fn assert_quiet(&mut self) {
        if let Ok(line) = timeout(QUIET_PERIOD, self.lines.next_line()).await {
            panic!("expected no message, got {line:?}");
        }
    }
}

pub fn connect_json(game_id: &str, name: &str) -> String {
    format!(r#"{{"type":"connect","game_id":"{game_id}","player_name":"{name}"}}"#)
}

pub fn move_json(row: u8, col: u8) -> String {
    format!(r#"{{"type":"move","row":{row},"col":{col}}}"#)
}

pub fn chat_json(text: &str) -> String {
    format!(r#"{{"type":"chat","message":"{text}"}}"#)
}
