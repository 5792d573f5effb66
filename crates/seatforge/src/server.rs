//! `SeatforgeServer` builder and dispatcher loop.
//!
//! This is the entry point for running a Seatforge server. It ties the
//! layers together: transport → admission queue → worker pool → session →
//! event store.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use seatforge_protocol::{BinaryCodec, Codec};
use seatforge_session::SessionIdAllocator;
use seatforge_store::{DumpFormat, EventStore, StoreConfig};
use seatforge_transport::{Transport, TransportError};
use tokio::io::AsyncWrite;

use crate::{
    AdmissionQueue, Admitter, ClientHandle, DumpTrigger, SeatforgeError, ServerConfig,
    WorkerPool,
};

/// Where dumps are written.
type DumpOutput = Box<dyn AsyncWrite + Unpin + Send>;

/// Builder for configuring a [`SeatforgeServer`].
///
/// # Example
///
/// ```rust,ignore
/// use seatforge::prelude::*;
///
/// let server = SeatforgeServerBuilder::new()
///     .workers(8)
///     .access_delay(Duration::from_micros(100))
///     .build(transport)?;
/// server.run().await
/// ```
pub struct SeatforgeServerBuilder {
    config: ServerConfig,
    dump_output: Option<DumpOutput>,
}

impl SeatforgeServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            dump_output: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the number of workers.
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Sets how many registered clients may wait for a worker.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Sets the event store configuration.
    pub fn store_config(mut self, store: StoreConfig) -> Self {
        self.config.store = store;
        self
    }

    /// Sets the artificial delay applied to every event lookup.
    pub fn access_delay(mut self, delay: Duration) -> Self {
        self.config.store.access_delay = delay;
        self
    }

    /// Sets how dumps are rendered.
    pub fn dump_format(mut self, format: DumpFormat) -> Self {
        self.config.dump_format = format;
        self
    }

    /// Sets where dumps are written. Defaults to standard output.
    pub fn dump_output(mut self, output: impl AsyncWrite + Unpin + Send + 'static) -> Self {
        self.dump_output = Some(Box::new(output));
        self
    }

    /// Builds a server around `transport` using the binary wire codec.
    pub fn build<T: Transport>(
        self,
        transport: T,
    ) -> Result<SeatforgeServer<T, BinaryCodec>, SeatforgeError> {
        self.build_with_codec(transport, BinaryCodec)
    }

    /// Builds a server around `transport` with a custom codec.
    pub fn build_with_codec<T: Transport, C: Codec>(
        self,
        transport: T,
        codec: C,
    ) -> Result<SeatforgeServer<T, C>, SeatforgeError> {
        self.config.validate()?;

        let store = Arc::new(EventStore::new(self.config.store.clone()));
        let dump_output = self
            .dump_output
            .unwrap_or_else(|| Box::new(tokio::io::stdout()));

        Ok(SeatforgeServer {
            transport,
            store,
            codec: Arc::new(codec),
            sessions: SessionIdAllocator::new(),
            dump_trigger: DumpTrigger::new(),
            dump_output,
            config: self.config,
        })
    }
}

impl Default for SeatforgeServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// What woke the dispatcher.
enum Wake<C> {
    Dump,
    Registered(Result<C, TransportError>),
}

/// A configured Seatforge server.
///
/// Call [`run`](Self::run) or [`run_until`](Self::run_until) to start the
/// worker pool and the dispatcher.
pub struct SeatforgeServer<T: Transport, C: Codec = BinaryCodec> {
    transport: T,
    store: Arc<EventStore>,
    codec: Arc<C>,
    sessions: SessionIdAllocator,
    dump_trigger: DumpTrigger,
    dump_output: DumpOutput,
    config: ServerConfig,
}

impl<T, C> SeatforgeServer<T, C>
where
    T: Transport,
    C: Codec,
{
    /// The server's event store.
    pub fn store(&self) -> Arc<EventStore> {
        Arc::clone(&self.store)
    }

    /// A handle for requesting dumps while the server runs.
    pub fn dump_trigger(&self) -> DumpTrigger {
        self.dump_trigger.clone()
    }

    /// The configuration the server was built with.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Runs until the transport shuts down.
    ///
    /// Clients already admitted are still served; returns once the last
    /// of them has finished.
    pub async fn run(self) -> Result<(), SeatforgeError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs until the transport shuts down or `shutdown` completes.
    ///
    /// On `shutdown`, registrations stop immediately, every worker is
    /// aborted, and clients still waiting in the queue are dropped
    /// unserved.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), SeatforgeError>
    where
        F: Future<Output = ()>,
    {
        let (admitter, queue) = AdmissionQueue::new(self.config.queue_capacity);
        let mut pool = WorkerPool::spawn(
            self.config.workers,
            queue,
            Arc::clone(&self.store),
            Arc::clone(&self.codec),
        );

        tracing::info!(
            workers = pool.size(),
            queue_capacity = self.config.queue_capacity,
            "seatforge server running"
        );

        let outcome = tokio::select! {
            () = shutdown => None,
            result = self.dispatch(&admitter) => Some(result),
        };
        drop(admitter);

        match outcome {
            None => {
                tracing::info!("shutdown requested, stopping workers");
                pool.abort();
                pool.join().await;
                Ok(())
            }
            Some(Ok(())) => {
                tracing::info!("registrations closed, draining admitted clients");
                pool.join().await;
                Ok(())
            }
            Some(Err(e)) => {
                tracing::error!(error = %e, "dispatcher failed");
                pool.abort();
                pool.join().await;
                Err(e)
            }
        }
    }

    /// Admits registrations until the transport shuts down, running a dump
    /// whenever one is requested.
    ///
    /// A pending dump is served before the next registration.
    async fn dispatch(
        &mut self,
        admitter: &Admitter<ClientHandle<T::Client>>,
    ) -> Result<(), SeatforgeError> {
        loop {
            let wake = tokio::select! {
                biased;
                () = self.dump_trigger.requested() => Wake::Dump,
                registered = self.transport.accept() => Wake::Registered(registered),
            };

            let channels = match wake {
                Wake::Dump => {
                    self.dump().await;
                    continue;
                }
                Wake::Registered(Ok(channels)) => channels,
                Wake::Registered(Err(TransportError::Shutdown)) => return Ok(()),
                Wake::Registered(Err(TransportError::InvalidRegistration(reason))) => {
                    tracing::warn!(%reason, "ignoring invalid registration");
                    continue;
                }
                Wake::Registered(Err(e)) => return Err(e.into()),
            };

            let session_id = self.sessions.allocate()?;
            tracing::debug!(session = %session_id, ?channels, "client registered");
            let handle = ClientHandle {
                session_id,
                channels,
            };
            if admitter.enqueue(handle).await.is_err() {
                // Every worker has exited; nobody can serve new clients.
                return Ok(());
            }
        }
    }

    async fn dump(&mut self) {
        match self
            .store
            .dump_all(&mut self.dump_output, self.config.dump_format)
            .await
        {
            Ok(0) => tracing::debug!("dump requested before any event exists"),
            Ok(events) => tracing::info!(events, "dump written"),
            Err(e) => tracing::warn!(error = %e, "dump failed"),
        }
    }
}
