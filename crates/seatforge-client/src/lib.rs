//! Client library for Seatforge.
//!
//! [`Client`] registers with a server over its named registration pipe,
//! then talks the binary request/response protocol over a private pair of
//! pipes it creates for itself.
//!
//! ```rust,no_run
//! use seatforge_client::Client;
//! use seatforge_protocol::{EventId, Seat};
//!
//! # async fn demo() -> Result<(), seatforge_client::ClientError> {
//! let mut client = Client::connect("/tmp/server", "/tmp/c1_req", "/tmp/c1_resp").await?;
//! client.create(EventId(1), 10, 20).await?;
//! client.reserve(EventId(1), &[Seat::new(1, 1), Seat::new(1, 2)]).await?;
//! print!("{}", client.show(EventId(1)).await?);
//! client.quit().await
//! # }
//! ```

#[cfg(unix)]
mod client;
mod error;
mod render;

#[cfg(unix)]
pub use client::Client;
pub use error::ClientError;
pub use render::render_event_list;
