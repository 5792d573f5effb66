//! Store configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for an [`EventStore`](crate::EventStore).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Pause inserted into every event lookup while the structural lock is
    /// held. Zero in production; raised in tests to widen contention
    /// windows.
    pub access_delay: Duration,
}

impl StoreConfig {
    /// Config with the given per-lookup delay.
    pub fn with_access_delay(access_delay: Duration) -> Self {
        Self { access_delay }
    }
}
