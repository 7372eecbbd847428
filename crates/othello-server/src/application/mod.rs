//! Application layer: game sessions, chat and the session registry.
//!
//! Nothing in this layer performs I/O.  Transports in `infrastructure` decode
//! wire messages, call into a [`SessionHandle`] and encode whatever comes back.

pub mod chat;
pub mod registry;
pub mod session;

pub use chat::ChatLog;
pub use registry::{
    DeliveryError, EventSink, Membership, SessionHandle, SessionRegistry, SessionRequest,
};
pub use session::{
    Audience, GameError, GameResult, GameSession, JoinOutcome, Phase, PlayerId, Seat,
    SessionEvent,
};
