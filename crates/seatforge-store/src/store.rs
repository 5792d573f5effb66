//! The event store: ordered collection of events behind a structural lock.

use std::collections::HashMap;
use std::sync::Arc;

use seatforge_protocol::{EventId, ReservationId, Seat, SeatMap};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::RwLock;

use crate::{DumpFormat, Event, EventSnapshot, StoreConfig, StoreError};

/// Events in creation order, indexed by id.
#[derive(Default)]
struct EventIndex {
    /// Insertion order. Events are never removed.
    events: Vec<Arc<Event>>,
    /// Position of each id in `events`.
    positions: HashMap<EventId, usize>,
}

impl EventIndex {
    fn get(&self, id: EventId) -> Option<&Arc<Event>> {
        self.positions.get(&id).map(|pos| &self.events[*pos])
    }
}

/// Shared, lock-protected store of every event.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct EventStore {
    index: RwLock<EventIndex>,
    config: StoreConfig,
}

impl EventStore {
    /// Creates an empty store.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            index: RwLock::new(EventIndex::default()),
            config,
        }
    }

    /// Returns the store's configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Simulates a slow state access. Called with the structural lock held.
    async fn access_delay(&self) {
        if !self.config.access_delay.is_zero() {
            tokio::time::sleep(self.config.access_delay).await;
        }
    }

    /// Creates a `rows` × `cols` event with every seat free.
    ///
    /// Holds the structural lock exclusively for the duplicate check and
    /// the insert.
    pub async fn create(&self, id: EventId, rows: usize, cols: usize) -> Result<(), StoreError> {
        // Allocate before taking the lock; a rejected id just drops it.
        let event = Event::new(id, rows, cols)?;

        let mut index = self.index.write().await;
        self.access_delay().await;
        if index.positions.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id));
        }
        let pos = index.events.len();
        index.positions.insert(id, pos);
        index.events.push(Arc::new(event));

        tracing::info!(event_id = %id, rows, cols, "event created");
        Ok(())
    }

    /// Finds an event under a shared structural lock, released on return.
    pub async fn get(&self, id: EventId) -> Result<Arc<Event>, StoreError> {
        let index = self.index.read().await;
        self.access_delay().await;
        index.get(id).cloned().ok_or(StoreError::NotFound(id))
    }

    /// Reserves `seats` on event `id`, all or nothing.
    ///
    /// The structural lock covers only the lookup. Reservations on
    /// different events then proceed in parallel, each under its own
    /// event lock.
    pub async fn reserve(&self, id: EventId, seats: &[Seat]) -> Result<ReservationId, StoreError> {
        let event = self.get(id).await?;
        event.reserve(seats).await
    }

    /// Returns a copy of event `id`'s seat grid.
    pub async fn show(&self, id: EventId) -> Result<SeatMap, StoreError> {
        let event = self.get(id).await?;
        Ok(event.snapshot().await)
    }

    /// Lists every event id in creation order.
    pub async fn list(&self) -> Vec<EventId> {
        let index = self.index.read().await;
        index.events.iter().map(|e| e.id()).collect()
    }

    /// Number of events.
    pub async fn len(&self) -> usize {
        self.index.read().await.events.len()
    }

    /// Returns `true` if no event has been created.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Events in creation order, as of now.
    ///
    /// The structural lock is held only long enough to clone the list, so
    /// long walks over the result never block `create`.
    async fn events(&self) -> Vec<Arc<Event>> {
        self.index.read().await.events.clone()
    }

    /// Writes every event's seat grid to `writer`, in creation order.
    ///
    /// Each event is captured under its own shared lock and written after
    /// the lock is released, so a slow writer never holds up reservations.
    /// Events created after the dump starts are not included. Returns the
    /// number of events written.
    pub async fn dump_all<W>(&self, writer: &mut W, format: DumpFormat) -> std::io::Result<usize>
    where
        W: AsyncWrite + Unpin,
    {
        let events = self.events().await;
        for event in &events {
            let snapshot = EventSnapshot::capture(event).await;
            let rendered = snapshot.render(format)?;
            writer.write_all(rendered.as_bytes()).await?;
        }
        writer.flush().await?;
        Ok(events.len())
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}
