//! In-memory event store for Seatforge.
//!
//! Events live for the whole process and are guarded by two tiers of
//! `tokio::sync::RwLock`:
//!
//! - a **structural lock** over the collection (membership and order),
//!   taken exclusively only by `create`
//! - a **per-event lock** over each seat grid, taken exclusively only by
//!   `reserve`
//!
//! The structural lock is always released before an event lock is taken,
//! and no operation holds two event locks at once.
//!
//! # Key types
//!
//! - [`EventStore`]: create, reserve, show, list, dump
//! - [`Event`]: one seat grid with its reservation counter
//! - [`StoreConfig`]: artificial access delay for contention testing
//! - [`DumpFormat`] / [`EventSnapshot`]: diagnostic rendering

mod config;
mod dump;
mod error;
mod event;
mod store;

pub use config::StoreConfig;
pub use dump::{DumpFormat, EventSnapshot};
pub use error::StoreError;
pub use event::Event;
pub use store::EventStore;
