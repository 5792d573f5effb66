//! Unified error type for Seatforge.

use seatforge_protocol::ProtocolError;
use seatforge_session::SessionError;
use seatforge_store::StoreError;
use seatforge_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum SeatforgeError {
    /// Registration or channel setup failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A message could not be framed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session ended abnormally.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// An event operation was rejected.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The server was configured with values it cannot run with.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use seatforge_protocol::EventId;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::InvalidRegistration("bad tag".into());
        let top: SeatforgeError = err.into();
        assert!(matches!(top, SeatforgeError::Transport(_)));
        assert!(top.to_string().contains("bad tag"));
    }

    #[test]
    fn test_from_protocol_error() {
        let top: SeatforgeError = ProtocolError::UnknownOpCode(b'9').into();
        assert!(matches!(top, SeatforgeError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let top: SeatforgeError = SessionError::Disconnected.into();
        assert!(matches!(top, SeatforgeError::Session(_)));
    }

    #[test]
    fn test_from_store_error() {
        let top: SeatforgeError = StoreError::NotFound(EventId(4)).into();
        assert!(matches!(top, SeatforgeError::Store(_)));
    }
}
