//! othello-client library entry point.
//!
//! Shared by the `othello-client` binary and the integration tests in
//! `tests/`.
//!
//! # Layers
//!
//! - [`application`]: pure logic with no I/O.  Parses typed commands into
//!   protocol requests and renders server messages as text.
//! - [`infrastructure`]: configuration and the two network bindings.  The
//!   push binding streams every event as it happens.  The poll binding
//!   asks the server for its state on a fixed interval.
//!
//! Both bindings feed the same `mpsc` channel of [`ServerMessage`]s, so the
//! front end never needs to know which one is in use.
//!
//! [`ServerMessage`]: othello_core::ServerMessage

pub mod application;
pub mod infrastructure;
