//! Session registry and the shared session contract used by every transport.
//!
//! The registry maps game ids to [`SessionHandle`]s.  Each handle owns one
//! [`GameSession`] behind its own `tokio::sync::Mutex`, together with the push
//! sinks of the players currently attached to it.  Transports never touch a
//! `GameSession` directly; they go through [`SessionHandle::execute`], which
//! applies the request, fans the resulting events out to push sinks while
//! the lock is still held, and returns the reply for the requester.
//!
//! # Ordering
//!
//! Events are delivered under the session lock immediately after the
//! mutation that produced them, so no player can observe an event before the
//! state it describes, and events from one session reach each sink in the
//! order the mutations happened.
//!
//! # Failed deliveries
//!
//! A sink that fails to accept an event is treated as a disconnect: that
//! player is detached and their seat vacated.  Other players are unaffected.

use std::collections::HashMap;
use std::sync::Arc;

use othello_core::{Color, ServerMessage};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::session::{Audience, GameError, GameSession, PlayerId, SessionEvent};

// ── Push sinks ────────────────────────────────────────────────────────────────

/// The push channel of one connection was closed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("push channel closed")]
pub struct DeliveryError;

/// Destination for events pushed to one connected player.
///
/// Delivery must not block: it is called with the session lock held.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    fn deliver(&self, message: &ServerMessage) -> Result<(), DeliveryError>;
}

/// The push bindings hand each connection's writer task the receiving end of
/// an unbounded channel; the session keeps the sender.
impl EventSink for mpsc::UnboundedSender<ServerMessage> {
    fn deliver(&self, message: &ServerMessage) -> Result<(), DeliveryError> {
        self.send(message.clone()).map_err(|_| DeliveryError)
    }
}

// ── Requests ──────────────────────────────────────────────────────────────────

/// A request from a seated player, already decoded from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRequest {
    Move { row: u8, col: u8 },
    Chat { text: String },
    RequestSurrender,
    RespondSurrender { accept: bool },
    Reset,
    /// Full snapshot, unread chat included.
    Snapshot,
    /// Highest-priority pending item for this player (poll binding).
    Poll,
}

// ── Session handle ────────────────────────────────────────────────────────────

struct Attached {
    color: Color,
    sink: Box<dyn EventSink>,
}

struct SessionSlot {
    session: GameSession,
    sinks: HashMap<PlayerId, Attached>,
    closed: bool,
}

/// Shared, lock-protected access to one game session.
pub struct SessionHandle {
    game_id: String,
    slot: Mutex<SessionSlot>,
}

/// A player's seat in a session, as returned by a successful join.
pub struct Membership {
    pub session: Arc<SessionHandle>,
    pub player_id: PlayerId,
    pub color: Color,
    /// The `connected` message for the joiner.
    pub connected: ServerMessage,
}

impl SessionHandle {
    fn new(game_id: &str) -> Self {
        Self {
            game_id: game_id.to_string(),
            slot: Mutex::new(SessionSlot {
                session: GameSession::new(game_id),
                sinks: HashMap::new(),
                closed: false,
            }),
        }
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// Seats a new player.
    ///
    /// With a `sink`, the player is attached to the push fan-out and receives
    /// its `connected` message (plus a snapshot when resuming a started game)
    /// through it.  Without one, the caller is responsible for sending
    /// [`Membership::connected`].
    pub async fn join(
        self: &Arc<Self>,
        name: &str,
        sink: Option<Box<dyn EventSink>>,
    ) -> Result<Membership, GameError> {
        let mut slot = self.slot.lock().await;
        if slot.closed {
            return Err(GameError::UnknownSession(self.game_id.clone()));
        }

        let player_id = Uuid::new_v4();
        let outcome = slot.session.join(player_id, name)?;
        let connected = outcome
            .events
            .iter()
            .find(|e| e.audience.includes(outcome.color))
            .map(|e| e.message.clone())
            .unwrap_or(ServerMessage::Ack);

        let mut events = outcome.events;
        if let Some(sink) = sink {
            slot.sinks.insert(
                player_id,
                Attached {
                    color: outcome.color,
                    sink,
                },
            );
            if outcome.resumed {
                let snapshot = slot.session.snapshot_for(outcome.color);
                events.push(SessionEvent {
                    audience: Audience::Only(outcome.color),
                    message: snapshot,
                });
            }
        }
        dispatch(&mut slot, events);

        Ok(Membership {
            session: Arc::clone(self),
            player_id,
            color: outcome.color,
            connected,
        })
    }

    /// Applies `request` on behalf of `player_id` and returns its reply.
    ///
    /// For commands the reply is the first event addressed to the requester
    /// (for example the echo of their own move) or `ack` when there is none.
    /// Events are also pushed to every attached sink before this returns.
    pub async fn execute(
        &self,
        player_id: PlayerId,
        request: SessionRequest,
    ) -> Result<ServerMessage, GameError> {
        let mut slot = self.slot.lock().await;
        if slot.closed {
            return Err(GameError::UnknownSession(self.game_id.clone()));
        }
        let color = slot
            .session
            .color_of(player_id)
            .ok_or(GameError::NotSeated)?;

        let session = &mut slot.session;
        let events = match request {
            SessionRequest::Move { row, col } => session.submit_move(player_id, row, col),
            SessionRequest::Chat { text } => session.send_chat(player_id, &text),
            SessionRequest::RequestSurrender => session.request_surrender(player_id),
            SessionRequest::RespondSurrender { accept } => {
                session.respond_surrender(player_id, accept)
            }
            SessionRequest::Reset => session.reset(player_id),
            SessionRequest::Snapshot => return Ok(session.snapshot_for(color)),
            SessionRequest::Poll => return session.poll_view(player_id),
        }?;

        let reply = events
            .iter()
            .find(|e| e.audience.includes(color))
            .map(|e| e.message.clone())
            .unwrap_or(ServerMessage::Ack);
        dispatch(&mut slot, events);
        Ok(reply)
    }

    /// Detaches `player_id` and vacates their seat.  Idempotent.
    pub async fn leave(&self, player_id: PlayerId) {
        let mut slot = self.slot.lock().await;
        slot.sinks.remove(&player_id);
        if slot.closed {
            return;
        }
        let events = slot.session.leave(player_id);
        dispatch(&mut slot, events);
    }

    /// Resets the session regardless of phase and notifies attached players.
    pub async fn force_reset(&self) -> Result<(), GameError> {
        let mut slot = self.slot.lock().await;
        if slot.closed {
            return Err(GameError::UnknownSession(self.game_id.clone()));
        }
        let events = slot.session.force_reset();
        dispatch(&mut slot, events);
        Ok(())
    }

    /// Runs `f` against the session state.  Used by tests and diagnostics.
    pub async fn inspect<R>(&self, f: impl FnOnce(&GameSession) -> R) -> R {
        let slot = self.slot.lock().await;
        f(&slot.session)
    }

    /// Number of players attached with a push sink.
    pub async fn attached(&self) -> usize {
        self.slot.lock().await.sinks.len()
    }

    async fn close(&self) {
        let mut slot = self.slot.lock().await;
        slot.closed = true;
        slot.sinks.clear();
    }
}

/// Pushes `events` to every attached sink in their audience.
///
/// Chat entries are marked read for each player they reach.  A player whose
/// sink fails is detached and their seat vacated; events produced by that
/// departure are delivered in turn.
fn dispatch(slot: &mut SessionSlot, events: Vec<SessionEvent>) {
    let mut pending = events;
    while !pending.is_empty() {
        let SessionSlot {
            session, sinks, ..
        } = &mut *slot;
        let mut failed = Vec::new();

        for event in &pending {
            for (player_id, attached) in sinks.iter() {
                if !event.audience.includes(attached.color) || failed.contains(player_id) {
                    continue;
                }
                match attached.sink.deliver(&event.message) {
                    Ok(()) => {
                        debug!(
                            "game {}: pushed {} to {}",
                            session.game_id(),
                            event.message.type_name(),
                            attached.color
                        );
                        if let ServerMessage::Chat(entry) = &event.message {
                            session.mark_chat_read(entry.id, attached.color);
                        }
                    }
                    Err(e) => {
                        warn!(
                            "game {}: {e} for {}, detaching player",
                            session.game_id(),
                            attached.color
                        );
                        failed.push(*player_id);
                    }
                }
            }
        }

        pending = Vec::new();
        for player_id in failed {
            sinks.remove(&player_id);
            pending.extend(session.leave(player_id));
        }
    }
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// All live sessions, keyed by game id.
///
/// Shared between connection tasks as an `Arc<SessionRegistry>`.  The map
/// lock is held only to look up or insert a handle, never across a session
/// operation.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session for `game_id`, creating it on first use.
    pub async fn get_or_create(&self, game_id: &str) -> Arc<SessionHandle> {
        if let Some(handle) = self.sessions.read().await.get(game_id) {
            return Arc::clone(handle);
        }
        let mut sessions = self.sessions.write().await;
        let handle = sessions.entry(game_id.to_string()).or_insert_with(|| {
            info!("created game session {game_id}");
            Arc::new(SessionHandle::new(game_id))
        });
        Arc::clone(handle)
    }

    pub async fn get(&self, game_id: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.read().await.get(game_id).cloned()
    }

    /// Seats `name` in game `game_id`, creating the session if needed.
    pub async fn join(
        &self,
        game_id: &str,
        name: &str,
        sink: Option<Box<dyn EventSink>>,
    ) -> Result<Membership, GameError> {
        let handle = self.get_or_create(game_id).await;
        handle.join(name, sink).await
    }

    /// Removes a session.  Players still holding its handle get
    /// `unknown_session` on their next request.  Returns `false` if no such
    /// session existed.
    pub async fn remove(&self, game_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(game_id);
        match removed {
            Some(handle) => {
                handle.close().await;
                info!("removed game session {game_id}");
                true
            }
            None => false,
        }
    }

    /// Resets `game_id` regardless of its phase.
    pub async fn force_reset(&self, game_id: &str) -> Result<(), GameError> {
        let handle = self
            .get(game_id)
            .await
            .ok_or_else(|| GameError::UnknownSession(game_id.to_string()))?;
        handle.force_reset().await
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Ids of all live sessions, sorted.
    pub async fn game_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
