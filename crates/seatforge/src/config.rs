//! Server configuration.

use seatforge_store::{DumpFormat, StoreConfig};
use serde::{Deserialize, Serialize};

use crate::SeatforgeError;

/// Sizing and diagnostics settings for a [`SeatforgeServer`](crate::SeatforgeServer).
///
/// Missing fields take their defaults when deserialized, so a config file
/// only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Number of sessions served at once. Fixed for the server's lifetime.
    pub workers: usize,

    /// Registered clients that may wait for a worker before the dispatcher
    /// stops accepting new registrations.
    pub queue_capacity: usize,

    /// How a dump renders the store.
    pub dump_format: DumpFormat,

    /// Event store settings.
    pub store: StoreConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 16,
            dump_format: DumpFormat::default(),
            store: StoreConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Rejects settings the server cannot start with.
    pub fn validate(&self) -> Result<(), SeatforgeError> {
        if self.workers == 0 {
            return Err(SeatforgeError::InvalidConfig(
                "worker count must be at least 1".into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(SeatforgeError::InvalidConfig(
                "queue capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
