//! Error types for the protocol layer.
//!
//! Every variant here is a channel error: the bytes on the wire cannot be
//! turned into a complete request. The session that hit one is closed.

/// Errors that can occur while reading or writing protocol messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Reading from the channel failed, including EOF in the middle of a
    /// message.
    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),

    /// Writing to the channel failed.
    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),

    /// The op code byte does not name any operation.
    #[error("unknown op code {0:#04x}")]
    UnknownOpCode(u8),

    /// A reservation asked for more seats than a single request may carry.
    #[error("reservation of {requested} seats exceeds limit of {limit}")]
    ReservationTooLarge {
        /// Seat count sent by the client.
        requested: u64,
        /// The largest accepted seat count.
        limit: usize,
    },

    /// A size field does not fit in this platform's `usize`.
    #[error("size field {0} out of range")]
    SizeOverflow(u64),

    /// The message is well-framed but invalid at the protocol level.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl ProtocolError {
    /// Returns `true` if the channel ended partway through a message.
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Read(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}
