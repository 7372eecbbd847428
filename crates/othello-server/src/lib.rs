//! othello-server library crate.
//!
//! An authoritative server for two-player Othello matches.  Clients join a
//! game by id, submit moves, chat and negotiate surrender; the server
//! validates everything against its own copy of the game and tells both
//! players what happened.
//!
//! # Architecture
//!
//! ```text
//! clients (push TCP :5000, poll TCP :5001, WebSocket :5002)
//!         ↕
//! [othello-server]
//!   ├── application/      GameSession state machine, chat log, SessionRegistry
//!   └── infrastructure/
//!         ├── transport   line and WebSocket framing
//!         ├── connection  push and poll bindings
//!         ├── server      listeners and accept loops
//!         └── config      TOML ServerConfig
//!         ↕
//! othello-core (board engine, wire messages, codec)
//! ```
//!
//! # Layer rules
//!
//! - `application` does no I/O and never awaits while mutating a session.
//! - `infrastructure` depends on `application`, never the other way round.

/// Application layer: sessions, chat and the session registry.
pub mod application;

/// Infrastructure layer: transports, bindings, listeners and configuration.
pub mod infrastructure;
