//! Error types for the session layer.

use seatforge_protocol::{ProtocolError, SessionId};
use seatforge_transport::TransportError;

/// Errors that end a session.
///
/// Validation failures from the store are not here: those are answered
/// with a status code and the session carries on.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The client's channels could not be opened.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A request could not be read, or a response could not be written.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The client closed its request channel without sending `terminate`.
    #[error("client disconnected without terminating")]
    Disconnected,

    /// A request carried someone else's session id.
    #[error("request for session {got} on session {expected}")]
    SessionIdMismatch {
        /// The id this session was assigned.
        expected: SessionId,
        /// The id found in the request.
        got: SessionId,
    },

    /// Every session id has been handed out.
    #[error("session ids exhausted")]
    IdsExhausted,
}
