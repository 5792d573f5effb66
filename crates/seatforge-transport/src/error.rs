//! Error types for the transport layer.

use std::path::PathBuf;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Creating or opening the registration endpoint failed.
    #[error("failed to bind registration endpoint {path}: {source}")]
    BindFailed {
        /// The endpoint that could not be bound.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Reading the next registration failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// A registration message did not follow the expected layout.
    #[error("invalid registration: {0}")]
    InvalidRegistration(String),

    /// Opening one of a client's channels failed.
    #[error("failed to open channel {path}: {source}")]
    OpenFailed {
        /// The channel that could not be opened.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The transport was shut down and will not yield more clients.
    #[error("transport shut down")]
    Shutdown,
}
