//! Error types for the store layer.

use seatforge_protocol::{EventId, Seat, Status};

/// Validation failures reported back to the client as a status code.
///
/// None of these end the session; the client may send its next request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// An event with this id already exists.
    #[error("event {0} already exists")]
    AlreadyExists(EventId),

    /// No event has this id.
    #[error("event {0} not found")]
    NotFound(EventId),

    /// Rows or columns were zero, or the grid is too large.
    #[error("invalid dimensions {rows}x{cols}")]
    InvalidDimensions {
        /// Requested rows.
        rows: usize,
        /// Requested columns.
        cols: usize,
    },

    /// A requested seat lies outside the event's grid.
    #[error("seat {seat} out of bounds for event {event_id}")]
    OutOfBounds {
        /// Target event.
        event_id: EventId,
        /// The first offending seat.
        seat: Seat,
    },

    /// A requested seat is already taken.
    #[error("seat {seat} of event {event_id} already reserved")]
    AlreadyReserved {
        /// Target event.
        event_id: EventId,
        /// The first offending seat.
        seat: Seat,
    },

    /// The event has issued every reservation id there is.
    #[error("reservation ids exhausted for event {0}")]
    ReservationsExhausted(EventId),
}

impl StoreError {
    /// Returns the wire status reported for this error.
    pub fn status(&self) -> Status {
        match self {
            Self::AlreadyExists(_) => Status::AlreadyExists,
            Self::NotFound(_) => Status::NotFound,
            Self::InvalidDimensions { .. } => Status::InvalidDimensions,
            Self::OutOfBounds { .. } => Status::OutOfBounds,
            Self::AlreadyReserved { .. } => Status::AlreadyReserved,
            Self::ReservationsExhausted(_) => Status::ReservationsExhausted,
        }
    }
}
