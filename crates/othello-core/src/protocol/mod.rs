//! Protocol module containing message types and the JSON line codec.

pub mod codec;
pub mod messages;
pub mod sequence;

pub use codec::{decode_client_message, decode_server_message, encode_line, scan_line, ProtocolError};
pub use messages::*;
pub use sequence::SequenceCounter;
