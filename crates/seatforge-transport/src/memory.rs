//! In-process transport built on `tokio::io::duplex`.
//!
//! Each registration carries two duplex pipes, one per direction, so the
//! server sees the same request/response split it would over named pipes.

use std::future::Future;

use tokio::io::DuplexStream;
use tokio::sync::mpsc;

use crate::{ClientChannels, Transport, TransportError};

/// Buffer size of each in-memory channel.
const CHANNEL_BUFFER: usize = 64 * 1024;

/// Server side of the in-memory transport.
pub struct MemoryTransport {
    registrations: mpsc::UnboundedReceiver<MemoryChannels>,
}

impl MemoryTransport {
    /// Creates a transport and the connector clients register through.
    ///
    /// The transport shuts down once every connector clone is dropped and
    /// all pending registrations have been accepted.
    pub fn new() -> (Self, MemoryConnector) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self { registrations: rx },
            MemoryConnector { registrations: tx },
        )
    }
}

impl Transport for MemoryTransport {
    type Client = MemoryChannels;

    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<MemoryChannels, TransportError>> + Send {
        // `mpsc::UnboundedReceiver::recv` is cancel-safe.
        async move {
            self.registrations
                .recv()
                .await
                .ok_or(TransportError::Shutdown)
        }
    }
}

/// Cloneable handle used by clients to register with a [`MemoryTransport`].
#[derive(Clone)]
pub struct MemoryConnector {
    registrations: mpsc::UnboundedSender<MemoryChannels>,
}

impl MemoryConnector {
    /// Registers a new client and returns its ends of the two channels.
    pub fn connect(&self) -> Result<MemoryClientEnd, TransportError> {
        let (server_requests, client_requests) = tokio::io::duplex(CHANNEL_BUFFER);
        let (server_responses, client_responses) = tokio::io::duplex(CHANNEL_BUFFER);

        self.registrations
            .send(MemoryChannels {
                requests: server_requests,
                responses: server_responses,
            })
            .map_err(|_| TransportError::Shutdown)?;

        Ok(MemoryClientEnd {
            requests: client_requests,
            responses: client_responses,
        })
    }
}

/// The server's view of one in-memory registration.
#[derive(Debug)]
pub struct MemoryChannels {
    requests: DuplexStream,
    responses: DuplexStream,
}

impl ClientChannels for MemoryChannels {
    type Reader = DuplexStream;
    type Writer = DuplexStream;

    fn open(
        self,
    ) -> impl Future<Output = Result<(DuplexStream, DuplexStream), TransportError>>
           + Send {
        async move { Ok((self.requests, self.responses)) }
    }
}

/// The client's ends of an in-memory registration.
#[derive(Debug)]
pub struct MemoryClientEnd {
    /// Write requests here.
    pub requests: DuplexStream,
    /// Read responses here.
    pub responses: DuplexStream,
}
