//! Client session handling for Seatforge.
//!
//! A session is one client's sequential request/response conversation,
//! driven by exactly one worker from registration until the client sends
//! `terminate` or its channel fails.
//!
//! 1. **Identity**: session ids come from a [`SessionIdAllocator`] at
//!    registration, independent of which worker later serves the client
//! 2. **Protocol**: [`Session`] reads one request at a time, applies it to
//!    the event store, and writes exactly one response (none for
//!    `terminate`)
//!
//! # How it fits in the stack
//!
//! ```text
//! Worker pool (above)  ← dequeues a client and calls `serve`
//!     ↕
//! Session layer (this crate)  ← request loop and state machine
//!     ↕
//! Protocol + Store (below)  ← framing and event operations
//! ```

mod error;
mod id;
mod session;

pub use error::SessionError;
pub use id::SessionIdAllocator;
pub use session::{Session, SessionState, SessionSummary, serve};
