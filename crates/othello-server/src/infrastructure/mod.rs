//! Infrastructure layer for the Othello server.
//!
//! Everything that touches the outside world lives here: listening sockets,
//! the WebSocket handshake, line and frame codecs, per-connection tasks and
//! the TOML configuration file.
//!
//! # What does NOT belong here?
//!
//! - Game rules and turn sequencing (that is `othello_core` and the
//!   application layer)
//! - Deciding who receives which event (that is the session registry)

pub mod config;
pub mod connection;
pub mod server;
pub mod transport;

pub use config::{load_config, ConfigError, ServerConfig};
pub use connection::{serve_poll, serve_push};
pub use server::{bind_listeners, run_server, serve, Binding, Listeners};
pub use transport::{FrameReader, FrameWriter, TransportError};
