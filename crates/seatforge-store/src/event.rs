//! A single event: a fixed seat grid behind its own lock.

use seatforge_protocol::{EventId, ReservationId, Seat, SeatMap};
use tokio::sync::RwLock;

use crate::StoreError;

/// Mutable part of an event, guarded by the event lock.
#[derive(Debug)]
struct SeatGrid {
    /// `rows * cols` cells, row-major. `0` is a free seat.
    cells: Vec<ReservationId>,
    /// The most recently issued reservation id, `0` before the first.
    last_reservation: ReservationId,
}

/// One event. `rows` and `cols` are fixed at creation; only the grid
/// behind [`RwLock`] ever changes.
#[derive(Debug)]
pub struct Event {
    id: EventId,
    rows: usize,
    cols: usize,
    seats: RwLock<SeatGrid>,
}

impl Event {
    /// Allocates an event with every seat free.
    ///
    /// The grid may hold at most `u32::MAX` seats, so every cell can hold
    /// any reservation id.
    pub(crate) fn new(id: EventId, rows: usize, cols: usize) -> Result<Self, StoreError> {
        let cells = rows
            .checked_mul(cols)
            .filter(|n| *n > 0 && *n <= ReservationId::MAX as usize)
            .ok_or(StoreError::InvalidDimensions { rows, cols })?;

        Ok(Self {
            id,
            rows,
            cols,
            seats: RwLock::new(SeatGrid {
                cells: vec![0; cells],
                last_reservation: 0,
            }),
        })
    }

    /// The event's id.
    pub fn id(&self) -> EventId {
        self.id
    }

    /// Row count.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Column count.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Maps a 1-indexed seat to its grid index, or `None` if out of bounds.
    fn seat_index(&self, seat: Seat) -> Option<usize> {
        if seat.row == 0 || seat.row > self.rows || seat.col == 0 || seat.col > self.cols {
            return None;
        }
        Some((seat.row - 1) * self.cols + (seat.col - 1))
    }

    /// Reserves every seat in `seats` under one new reservation id.
    ///
    /// All-or-nothing: if any seat is out of bounds or taken, nothing is
    /// written and no id is consumed. A seat listed twice is reserved once.
    /// An empty list passes every check and consumes an id.
    pub async fn reserve(&self, seats: &[Seat]) -> Result<ReservationId, StoreError> {
        let mut grid = self.seats.write().await;

        let indices = seats
            .iter()
            .map(|seat| {
                self.seat_index(*seat).ok_or(StoreError::OutOfBounds {
                    event_id: self.id,
                    seat: *seat,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(pos) = indices.iter().position(|i| grid.cells[*i] != 0) {
            return Err(StoreError::AlreadyReserved {
                event_id: self.id,
                seat: seats[pos],
            });
        }

        let reservation = grid
            .last_reservation
            .checked_add(1)
            .ok_or(StoreError::ReservationsExhausted(self.id))?;
        grid.last_reservation = reservation;
        for i in indices {
            grid.cells[i] = reservation;
        }

        tracing::debug!(
            event_id = %self.id,
            reservation,
            seats = seats.len(),
            "seats reserved"
        );
        Ok(reservation)
    }

    /// Copies the grid under a shared event lock.
    pub async fn snapshot(&self) -> SeatMap {
        let grid = self.seats.read().await;
        SeatMap {
            rows: self.rows,
            cols: self.cols,
            seats: grid.cells.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) async fn reservation_count(&self) -> ReservationId {
        self.seats.read().await.last_reservation
    }
}
