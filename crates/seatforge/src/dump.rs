//! The "dump requested" signal.

use std::sync::Arc;

use tokio::sync::Notify;

/// Asks the dispatcher to write every event to its dump output.
///
/// Requests coalesce: any number of [`request`](Self::request) calls made
/// before the dispatcher gets to them produce exactly one dump. Cheap to
/// clone and safe to call from any task, including a signal handler task.
#[derive(Debug, Clone, Default)]
pub struct DumpTrigger {
    notify: Arc<Notify>,
}

impl DumpTrigger {
    /// Creates a trigger with no pending request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags a dump. Returns immediately.
    pub fn request(&self) {
        // `notify_one` stores at most one permit, which is the coalescing.
        self.notify.notify_one();
    }

    /// Waits for a pending request and clears it. Cancel-safe.
    pub(crate) async fn requested(&self) {
        self.notify.notified().await;
    }
}
