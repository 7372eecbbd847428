//! Domain entities for Othello.
//!
//! This module contains pure game rules with no infrastructure dependencies:
//! no sockets, no clocks, no locks.  Everything here is deterministic, which
//! makes it trivially unit-testable and safe to call while holding a session
//! lock on the server.

/// Board state and the Othello rule engine.
///
/// See [`board::Board`] for the main type.
pub mod board;
