//! # othello-core
//!
//! Shared library for the Othello match server and its clients, containing
//! the board rule engine, the wire protocol message types and the JSON line
//! codec.
//!
//! This crate is used by both the server and the client applications.
//! It has zero dependencies on sockets, async runtimes, or UI frameworks.
//!
//! # Architecture overview
//!
//! - **`domain`** – Pure game rules.  The [`Board`] knows which moves are
//!   legal, how a move flips pieces, and how to score a position.  Nothing in
//!   here knows about players, turns, or networking.
//!
//! - **`protocol`** – How messages travel over the network.  Every message is
//!   a single JSON object with a `"type"` tag, decoded once at the transport
//!   boundary into a closed enum ([`ClientMessage`] / [`ServerMessage`]).

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `othello_core::Board` instead of `othello_core::domain::board::Board`.
pub use domain::board::{Board, Color, Position, Score, BOARD_SIZE};
pub use protocol::codec::{decode_client_message, decode_server_message, encode_line, scan_line, ProtocolError};
pub use protocol::messages::{ClientMessage, ErrorCode, ServerMessage};
