//! Session id assignment.

use std::sync::atomic::{AtomicI32, Ordering};

use seatforge_protocol::SessionId;

use crate::SessionError;

/// Hands out session ids from a monotonically increasing counter.
///
/// Ids are assigned at registration, so they are unique for the life of the
/// server no matter which worker ends up serving the client.
#[derive(Debug, Default)]
pub struct SessionIdAllocator {
    next: AtomicI32,
}

impl SessionIdAllocator {
    /// Creates an allocator whose first id is `0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next unused id.
    ///
    /// # Errors
    /// Returns [`SessionError::IdsExhausted`] once `i32::MAX - 1` has been
    /// handed out. `i32::MAX` itself is never issued and ids are never
    /// reused.
    pub fn allocate(&self) -> Result<SessionId, SessionError> {
        self.next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| id.checked_add(1))
            .map(SessionId)
            .map_err(|_| SessionError::IdsExhausted)
    }
}
