//! Listeners and accept loops.
//!
//! The server exposes up to three listeners, all backed by the same
//! [`SessionRegistry`]:
//!
//! | binding        | default port | framing                          |
//! |----------------|--------------|----------------------------------|
//! | push (TCP)     | 5000         | newline-delimited JSON           |
//! | poll (TCP)     | 5001         | newline-delimited JSON           |
//! | push (WebSocket) | 5002       | one JSON object per text frame   |
//!
//! Binding is split from serving so that callers (and tests) can bind to
//! port 0 and learn the real addresses before any client connects.
//!
//! Each accepted connection runs in its own Tokio task; one misbehaving
//! client never blocks the accept loop or other sessions.  The loops poll
//! the shared `running` flag every 200 ms and return once it is cleared.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tracing::{error, info, warn};

use crate::application::SessionRegistry;
use crate::infrastructure::config::ServerConfig;
use crate::infrastructure::connection::{serve_poll, serve_push};
use crate::infrastructure::transport::{split_tcp, split_ws};

/// How often accept loops re-check the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Which protocol a listener speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Push,
    Poll,
    WebSocket,
}

impl std::fmt::Display for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Binding::Push => f.write_str("push"),
            Binding::Poll => f.write_str("poll"),
            Binding::WebSocket => f.write_str("websocket"),
        }
    }
}

/// Bound, not yet serving, listeners.
pub struct Listeners {
    pub push: TcpListener,
    pub poll: Option<TcpListener>,
    pub ws: Option<TcpListener>,
}

impl Listeners {
    pub fn push_addr(&self) -> std::io::Result<SocketAddr> {
        self.push.local_addr()
    }

    pub fn poll_addr(&self) -> Option<SocketAddr> {
        self.poll.as_ref().and_then(|l| l.local_addr().ok())
    }

    pub fn ws_addr(&self) -> Option<SocketAddr> {
        self.ws.as_ref().and_then(|l| l.local_addr().ok())
    }
}

/// Binds every listener enabled in `config`.
///
/// # Errors
///
/// Returns an error if an address is invalid or a port cannot be bound.
pub async fn bind_listeners(config: &ServerConfig) -> anyhow::Result<Listeners> {
    let push = bind(config.push_addr()?, Binding::Push).await?;
    let poll = match config.poll_addr()? {
        Some(addr) => Some(bind(addr, Binding::Poll).await?),
        None => None,
    };
    let ws = match config.ws_addr()? {
        Some(addr) => Some(bind(addr, Binding::WebSocket).await?),
        None => None,
    };
    Ok(Listeners { push, poll, ws })
}

async fn bind(addr: SocketAddr, binding: Binding) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {binding} listener on {addr}"))?;
    info!("{binding} binding listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Serves all `listeners` until `running` is cleared.
pub async fn serve(
    listeners: Listeners,
    registry: Arc<SessionRegistry>,
    config: Arc<ServerConfig>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let Listeners { push, poll, ws } = listeners;

    let mut loops = Vec::new();
    for (listener, binding) in [
        (Some(push), Binding::Push),
        (poll, Binding::Poll),
        (ws, Binding::WebSocket),
    ] {
        if let Some(listener) = listener {
            loops.push(tokio::spawn(accept_loop(
                listener,
                binding,
                Arc::clone(&registry),
                Arc::clone(&config),
                Arc::clone(&running),
            )));
        }
    }

    for handle in loops {
        handle.await.context("accept loop panicked")?;
    }
    Ok(())
}

/// Binds according to `config` and serves until `running` is cleared.
pub async fn run_server(config: ServerConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let listeners = bind_listeners(&config).await?;
    serve(
        listeners,
        Arc::new(SessionRegistry::new()),
        Arc::new(config),
        running,
    )
    .await
}

async fn accept_loop(
    listener: TcpListener,
    binding: Binding,
    registry: Arc<SessionRegistry>,
    config: Arc<ServerConfig>,
    running: Arc<AtomicBool>,
) {
    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping {binding} accept loop");
            break;
        }

        match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                info!("new {binding} connection from {peer_addr}");
                let registry = Arc::clone(&registry);
                let config = Arc::clone(&config);
                tokio::spawn(async move {
                    handle_connection(stream, peer_addr, binding, registry, config).await;
                });
            }
            Ok(Err(e)) => error!("{binding} accept error: {e}"),
            Err(_) => {
                // No connection in the last interval; re-check the flag.
            }
        }
    }
}

// ── Per-connection handler ────────────────────────────────────────────────────

async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    binding: Binding,
    registry: Arc<SessionRegistry>,
    config: Arc<ServerConfig>,
) {
    match run_connection(stream, peer_addr, binding, registry, config).await {
        Ok(()) => info!("{binding} connection {peer_addr} closed normally"),
        Err(e) => warn!("{binding} connection {peer_addr} closed with error: {e:#}"),
    }
}

async fn run_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    binding: Binding,
    registry: Arc<SessionRegistry>,
    config: Arc<ServerConfig>,
) -> anyhow::Result<()> {
    let peer = peer_addr.to_string();
    if let Err(e) = stream.set_nodelay(true) {
        warn!("{peer}: could not disable Nagle: {e}");
    }

    match binding {
        Binding::Push => {
            let (reader, writer) = split_tcp(stream);
            serve_push(reader, writer, registry, config, &peer).await?;
        }
        Binding::Poll => {
            let (reader, writer) = split_tcp(stream);
            serve_poll(reader, writer, registry, config, &peer).await?;
        }
        Binding::WebSocket => {
            let ws = accept_async(stream)
                .await
                .with_context(|| format!("WebSocket handshake failed with {peer}"))?;
            let (reader, writer) = split_ws(ws);
            serve_push(reader, writer, registry, config, &peer).await?;
        }
    }
    Ok(())
}
