//! Per-connection handlers for the push and poll bindings.
//!
//! Both bindings speak the same client messages and drive the same
//! [`SessionHandle`]; they differ only in how server messages reach the
//! client:
//!
//! - **push** ([`serve_push`]): the connection registers a sink with its
//!   session.  Every event is delivered as soon as it happens through a
//!   dedicated writer task.  Only errors and `get_state` snapshots are sent
//!   directly in answer to a request.
//! - **poll** ([`serve_poll`]): strictly one reply per request, nothing
//!   unsolicited.  `get_state` returns the single most relevant pending item
//!   for the player.
//!
//! In both bindings the first message must be `connect`.  When the
//! connection ends, for whatever reason, the player's seat is vacated.

use std::sync::Arc;

use othello_core::{ClientMessage, ErrorCode, ServerMessage};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::application::{GameError, Membership, SessionRegistry, SessionRequest};
use crate::infrastructure::config::ServerConfig;
use crate::infrastructure::transport::{FrameReader, FrameWriter, TransportError};

/// What a decoded client message asks the connection to do.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Intent {
    Connect { game_id: String, player_name: String },
    Request(SessionRequest),
    Disconnect,
}

/// Maps a client message onto an [`Intent`].
///
/// `get_state` means different things per binding, so the caller supplies
/// the request it stands for.
fn classify(message: ClientMessage, get_state: SessionRequest, config: &ServerConfig) -> Intent {
    match message {
        ClientMessage::Connect {
            game_id,
            player_name,
        } => Intent::Connect {
            game_id: non_blank(game_id).unwrap_or_else(|| config.default_game_id.clone()),
            player_name: non_blank(player_name)
                .unwrap_or_else(|| config.default_player_name.clone()),
        },
        ClientMessage::Move { row, col } => Intent::Request(SessionRequest::Move { row, col }),
        ClientMessage::Chat { message, .. } => {
            Intent::Request(SessionRequest::Chat { text: message })
        }
        ClientMessage::SurrenderRequest => Intent::Request(SessionRequest::RequestSurrender),
        ClientMessage::SurrenderResponse { accept } => {
            Intent::Request(SessionRequest::RespondSurrender { accept })
        }
        ClientMessage::Reset => Intent::Request(SessionRequest::Reset),
        ClientMessage::GetState => Intent::Request(get_state),
        ClientMessage::Disconnect => Intent::Disconnect,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn error_message(code: ErrorCode, message: impl Into<String>) -> ServerMessage {
    ServerMessage::Error {
        code,
        message: message.into(),
    }
}

fn invalid_message(err: &TransportError) -> ServerMessage {
    error_message(ErrorCode::InvalidMessage, err.to_string())
}

fn not_connected() -> ServerMessage {
    error_message(ErrorCode::NotConnected, "send a connect message first")
}

fn already_connected() -> ServerMessage {
    error_message(ErrorCode::InvalidMessage, "already connected")
}

// ── Push binding ──────────────────────────────────────────────────────────────

/// Serves one push-binding connection until the peer leaves.
///
/// # Errors
///
/// Returns the fatal transport error that ended the connection, if any.
pub async fn serve_push<R, W>(
    mut reader: R,
    mut writer: W,
    registry: Arc<SessionRegistry>,
    config: Arc<ServerConfig>,
    peer: &str,
) -> Result<(), TransportError>
where
    R: FrameReader,
    W: FrameWriter + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    // ── Step 1: wait for a successful connect ─────────────────────────────────
    let membership = loop {
        let message = match reader.next_message().await {
            Ok(Some(message)) => message,
            Ok(None) => return Ok(()),
            Err(e) if !e.is_fatal() => {
                writer.send(&invalid_message(&e)).await?;
                continue;
            }
            Err(e) => return Err(e),
        };
        match classify(message, SessionRequest::Snapshot, &config) {
            Intent::Connect {
                game_id,
                player_name,
            } => match registry
                .join(&game_id, &player_name, Some(Box::new(tx.clone())))
                .await
            {
                Ok(membership) => break membership,
                Err(e) => {
                    warn!("{peer}: connect to {game_id} as {player_name} rejected: {e}");
                    writer.send(&e.to_message()).await?;
                }
            },
            Intent::Disconnect => return Ok(()),
            Intent::Request(_) => writer.send(&not_connected()).await?,
        }
    };
    info!(
        "{peer}: joined {} as {}",
        membership.session.game_id(),
        membership.color
    );

    // ── Step 2: writer task drains the push channel ───────────────────────────
    let mut writer_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            writer.send(&message).await?;
        }
        Ok::<(), TransportError>(())
    });

    // ── Step 3: read requests until the peer leaves or the writer fails ───────
    let result = tokio::select! {
        r = push_requests(&mut reader, &membership, &tx, &config, peer) => r,
        w = &mut writer_task => match w {
            Ok(r) => r,
            Err(join_err) => {
                warn!("{peer}: writer task failed: {join_err}");
                Err(TransportError::Closed)
            }
        },
    };

    membership.session.leave(membership.player_id).await;
    drop(tx);
    if !writer_task.is_finished() {
        // All senders are gone now, so the task ends after flushing.
        let _ = writer_task.await;
    }
    info!("{peer}: left {}", membership.session.game_id());
    result
}

async fn push_requests<R: FrameReader>(
    reader: &mut R,
    membership: &Membership,
    tx: &mpsc::UnboundedSender<ServerMessage>,
    config: &ServerConfig,
    peer: &str,
) -> Result<(), TransportError> {
    let reply = |message: ServerMessage| tx.send(message).map_err(|_| TransportError::Closed);

    loop {
        let message = match reader.next_message().await {
            Ok(Some(message)) => message,
            Ok(None) => return Ok(()),
            Err(e) if !e.is_fatal() => {
                reply(invalid_message(&e))?;
                continue;
            }
            Err(e) => return Err(e),
        };
        debug!("{peer}: received {}", message.type_name());

        let request = match classify(message, SessionRequest::Snapshot, config) {
            Intent::Request(request) => request,
            Intent::Connect { .. } => {
                reply(already_connected())?;
                continue;
            }
            Intent::Disconnect => return Ok(()),
        };
        let is_snapshot = request == SessionRequest::Snapshot;

        match membership
            .session
            .execute(membership.player_id, request)
            .await
        {
            Ok(state) if is_snapshot => reply(state)?,
            // Everything else already went out through the session's sink.
            Ok(_) => {}
            Err(e @ GameError::UnknownSession(_)) => {
                reply(e.to_message())?;
                return Ok(());
            }
            Err(e) => {
                debug!("{peer}: request rejected: {e}");
                reply(e.to_message())?;
            }
        }
    }
}

// ── Poll binding ──────────────────────────────────────────────────────────────

/// Serves one poll-binding connection: exactly one reply per request.
///
/// # Errors
///
/// Returns the fatal transport error that ended the connection, if any.
pub async fn serve_poll<R, W>(
    mut reader: R,
    mut writer: W,
    registry: Arc<SessionRegistry>,
    config: Arc<ServerConfig>,
    peer: &str,
) -> Result<(), TransportError>
where
    R: FrameReader,
    W: FrameWriter,
{
    let mut member: Option<Membership> = None;

    let result = loop {
        let message = match reader.next_message().await {
            Ok(Some(message)) => message,
            Ok(None) => break Ok(()),
            Err(e) if !e.is_fatal() => {
                if let Err(e) = writer.send(&invalid_message(&e)).await {
                    break Err(e);
                }
                continue;
            }
            Err(e) => break Err(e),
        };
        debug!("{peer}: received {}", message.type_name());

        let reply = match classify(message, SessionRequest::Poll, &config) {
            Intent::Disconnect => break Ok(()),
            Intent::Connect { .. } if member.is_some() => already_connected(),
            Intent::Connect {
                game_id,
                player_name,
            } => match registry.join(&game_id, &player_name, None).await {
                Ok(joined) => {
                    info!("{peer}: joined {game_id} as {} (poll)", joined.color);
                    let connected = joined.connected.clone();
                    member = Some(joined);
                    connected
                }
                Err(e) => {
                    warn!("{peer}: connect to {game_id} as {player_name} rejected: {e}");
                    e.to_message()
                }
            },
            Intent::Request(request) => match &member {
                None => not_connected(),
                Some(joined) => match joined.session.execute(joined.player_id, request).await {
                    Ok(reply) => reply,
                    Err(e) => e.to_message(),
                },
            },
        };

        if let Err(e) = writer.send(&reply).await {
            break Err(e);
        }
    };

    if let Some(joined) = member {
        joined.session.leave(joined.player_id).await;
        info!("{peer}: left {} (poll)", joined.session.game_id());
    }
    result
}

// ── Tests ─────────────────────────────────────────────────────────────────────
