//! Transport abstraction layer for Seatforge.
//!
//! A client talks to the server over two one-way byte channels: a request
//! channel the server reads and a response channel the server writes. How
//! those channels come to exist is the transport's business. This crate
//! provides the [`Transport`] and [`ClientChannels`] traits plus two
//! implementations:
//!
//! - [`FifoTransport`] (Unix, `fifo` feature): named pipes, with clients
//!   announcing their pipe paths on a well-known registration pipe
//! - [`MemoryTransport`]: in-process duplex streams, used by tests
//!
//! # Feature Flags
//!
//! - `fifo` (default): named-pipe transport via `tokio::net::unix::pipe`

#[cfg(all(unix, feature = "fifo"))]
mod fifo;
mod error;
mod memory;

pub use error::TransportError;
#[cfg(all(unix, feature = "fifo"))]
pub use fifo::{
    FifoChannels, FifoTransport, PIPE_NAME_SIZE, REGISTRATION_LEN,
    REGISTRATION_TAG, RegistrationMessage, make_fifo,
};
pub use memory::{MemoryChannels, MemoryClientEnd, MemoryConnector, MemoryTransport};

use std::fmt;
use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};

/// Yields newly registered clients.
///
/// The dispatcher races [`accept`](Self::accept) against other wake-ups
/// inside `tokio::select!`, so implementations must be cancel-safe: a
/// dropped `accept` future must not lose a partially read registration.
pub trait Transport: Send + 'static {
    /// The not-yet-opened channel pair produced for each registration.
    type Client: ClientChannels;

    /// Waits for the next client registration.
    ///
    /// Returns [`TransportError::Shutdown`] once no further registrations
    /// can ever arrive.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Client, TransportError>> + Send;
}

/// A registered client's request/response channel pair.
///
/// Opening may block until the client opens its own ends, so it is done by
/// whichever worker picks the client up, never by the dispatcher.
pub trait ClientChannels: fmt::Debug + Send + 'static {
    /// The server's reading end of the request channel.
    type Reader: AsyncRead + Unpin + Send + 'static;
    /// The server's writing end of the response channel.
    type Writer: AsyncWrite + Unpin + Send + 'static;

    /// Opens both channels. Response first, then request, matching the order
    /// clients open their own ends in.
    fn open(
        self,
    ) -> impl Future<Output = Result<(Self::Reader, Self::Writer), TransportError>>
           + Send;
}
