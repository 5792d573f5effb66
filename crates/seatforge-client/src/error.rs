//! Error types for the client library.

use std::path::PathBuf;

use seatforge_protocol::{ProtocolError, Status};
use seatforge_transport::TransportError;

/// Errors returned by [`Client`](crate::Client) operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A pipe could not be created or opened.
    #[error("pipe {path} unavailable: {source}")]
    Pipe {
        /// The pipe's path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The registration message could not be built.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A request could not be sent or a response could not be read.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The server answered with a failure status.
    #[error("server rejected request: {0}")]
    Rejected(Status),

    /// The server answered with a status code this client does not know.
    #[error("server returned unknown status {0}")]
    UnknownStatus(i32),
}

impl ClientError {
    /// Maps a raw status code to `Ok` or the matching error.
    pub(crate) fn check(code: i32) -> Result<(), Self> {
        match Status::from_code(code) {
            Some(Status::Ok) => Ok(()),
            Some(status) => Err(Self::Rejected(status)),
            None => Err(Self::UnknownStatus(code)),
        }
    }

    /// The server's status, if this is a rejection.
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::Rejected(status) => Some(*status),
            _ => None,
        }
    }
}
