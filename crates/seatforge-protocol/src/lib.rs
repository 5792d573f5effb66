//! Wire protocol for Seatforge.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Types** ([`Envelope`], [`Request`], [`Response`], [`Status`], etc.):
//!   the messages that travel on the request and response channels.
//! - **Codec** ([`Codec`] trait, [`BinaryCodec`]): how those messages
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw byte channels) and the
//! session state machine. It doesn't know about events or locks, only how
//! to frame requests and responses.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Session (store operations)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{BinaryCodec, Codec, MAX_RESERVATION_SIZE};
pub use error::ProtocolError;
pub use types::{
    Envelope, EventId, OpCode, Request, ReservationId, Response, Seat, SeatMap,
    SessionId, Status,
};
