//! # Seatforge
//!
//! Concurrent seat-reservation server for ticketed events.
//!
//! Clients register over a [`Transport`], wait in a bounded FIFO
//! [`AdmissionQueue`], and are served one at a time by a fixed
//! [`WorkerPool`]. Every worker shares one [`EventStore`]; a
//! [`DumpTrigger`] asks the dispatcher to print the whole store between
//! registrations.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use seatforge::prelude::*;
//!
//! # async fn start() -> Result<(), SeatforgeError> {
//! let transport = FifoTransport::bind("/tmp/seatforge.pipe").await?;
//! let server = SeatforgeServerBuilder::new()
//!     .workers(4)
//!     .queue_capacity(16)
//!     .build(transport)?;
//! server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await
//! # }
//! ```

mod config;
mod dump;
mod error;
mod pool;
mod queue;
mod server;

pub use config::ServerConfig;
pub use dump::DumpTrigger;
pub use error::SeatforgeError;
pub use pool::WorkerPool;
pub use queue::{AdmissionQueue, Admitter, ClientHandle, QueueClosed};
pub use server::{SeatforgeServer, SeatforgeServerBuilder};

/// Convenience re-exports of everything needed to run a server.
pub mod prelude {
    pub use crate::{
        DumpTrigger, SeatforgeError, SeatforgeServer, SeatforgeServerBuilder,
        ServerConfig,
    };
    pub use seatforge_protocol::{
        BinaryCodec, Codec, EventId, ProtocolError, ReservationId, Seat,
        SeatMap, SessionId, Status,
    };
    pub use seatforge_session::SessionError;
    pub use seatforge_store::{DumpFormat, EventStore, StoreConfig, StoreError};
    #[cfg(unix)]
    pub use seatforge_transport::FifoTransport;
    pub use seatforge_transport::{
        ClientChannels, MemoryConnector, MemoryTransport, Transport,
        TransportError,
    };
}
