//! The fixed pool of session workers.

use std::sync::Arc;

use seatforge_protocol::Codec;
use seatforge_session::{SessionError, serve};
use seatforge_store::EventStore;
use seatforge_transport::ClientChannels;
use tokio::task::JoinSet;

use crate::{AdmissionQueue, ClientHandle};

/// `size` long-lived tasks, each serving one session at a time.
///
/// A worker pulls the next client from the queue, serves it to the end,
/// and goes back for another. A session that fails is logged and dropped;
/// the worker carries on. Workers exit once the queue is closed and empty.
#[derive(Debug)]
pub struct WorkerPool {
    workers: JoinSet<()>,
    size: usize,
}

impl WorkerPool {
    /// Starts `size` workers pulling from `queue`.
    pub fn spawn<T, C>(
        size: usize,
        queue: AdmissionQueue<ClientHandle<T>>,
        store: Arc<EventStore>,
        codec: Arc<C>,
    ) -> Self
    where
        T: ClientChannels,
        C: Codec,
    {
        let mut workers = JoinSet::new();
        for worker in 0..size {
            workers.spawn(work(
                worker,
                queue.clone(),
                Arc::clone(&store),
                Arc::clone(&codec),
            ));
        }
        Self { workers, size }
    }

    /// Number of workers started.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Stops every worker at its next await point. In-flight sessions are
    /// dropped, closing their channels.
    pub fn abort(&mut self) {
        self.workers.abort_all();
    }

    /// Waits for every worker to exit.
    pub async fn join(mut self) {
        while let Some(result) = self.workers.join_next().await {
            match result {
                Err(e) if e.is_panic() => tracing::error!(error = %e, "worker panicked"),
                _ => {}
            }
        }
    }
}

async fn work<T, C>(
    worker: usize,
    queue: AdmissionQueue<ClientHandle<T>>,
    store: Arc<EventStore>,
    codec: Arc<C>,
) where
    T: ClientChannels,
    C: Codec,
{
    while let Some(ClientHandle {
        session_id,
        channels,
    }) = queue.dequeue().await
    {
        tracing::debug!(worker, session = %session_id, ?channels, "session started");
        match serve(session_id, channels, &store, codec.as_ref()).await {
            Ok(summary) => tracing::info!(
                worker,
                session = %session_id,
                requests = summary.requests,
                "session ended"
            ),
            Err(SessionError::Disconnected) => tracing::info!(
                worker,
                session = %session_id,
                "client left without terminating"
            ),
            Err(e) => tracing::warn!(
                worker,
                session = %session_id,
                error = %e,
                "session closed on error"
            ),
        }
    }
    tracing::debug!(worker, "worker stopped");
}
