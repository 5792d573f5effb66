//! Core protocol types for Seatforge's wire format.
//!
//! These are the structures that cross the request and response channels.
//! Their byte layout lives in [`codec`](crate::BinaryCodec); this module
//! only says what the messages mean.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifier the server assigns to a client at registration.
///
/// Sent back as the first bytes on the response channel and repeated by
/// the client in every request. Signed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub i32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// Caller-assigned identifier of an event. Never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EventId(pub u32);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-event reservation number. `0` marks a free seat; the first
/// successful reservation on an event is `1`.
pub type ReservationId = u32;

/// A seat address, 1-indexed in both dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Seat {
    /// Row, starting at 1.
    pub row: usize,
    /// Column, starting at 1.
    pub col: usize,
}

impl Seat {
    /// Creates a seat address.
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// The single byte that opens every request.
///
/// Values are ASCII digits; `'1'` is taken by the registration message on
/// the transport's registration channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    /// End the session.
    Terminate = b'2',
    /// Create an event.
    Create = b'3',
    /// Reserve seats on an event.
    Reserve = b'4',
    /// Fetch an event's seat map.
    Show = b'5',
    /// List all event ids.
    List = b'6',
}

impl OpCode {
    /// Returns the wire byte for this op code.
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for OpCode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        match byte {
            b'2' => Ok(Self::Terminate),
            b'3' => Ok(Self::Create),
            b'4' => Ok(Self::Reserve),
            b'5' => Ok(Self::Show),
            b'6' => Ok(Self::List),
            other => Err(other),
        }
    }
}

/// A decoded client operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// End the session. No response is sent.
    Terminate,
    /// Create a `rows` × `cols` event.
    Create {
        /// Identifier chosen by the client.
        event_id: EventId,
        /// Row count.
        rows: usize,
        /// Column count.
        cols: usize,
    },
    /// Reserve every listed seat under one reservation id, or none of them.
    Reserve {
        /// Target event.
        event_id: EventId,
        /// Requested seats, in request order.
        seats: Vec<Seat>,
    },
    /// Fetch the event's full seat map.
    Show {
        /// Target event.
        event_id: EventId,
    },
    /// List event ids in creation order.
    List,
}

impl Request {
    /// Returns the op code this request is sent under.
    pub fn op_code(&self) -> OpCode {
        match self {
            Self::Terminate => OpCode::Terminate,
            Self::Create { .. } => OpCode::Create,
            Self::Reserve { .. } => OpCode::Reserve,
            Self::Show { .. } => OpCode::Show,
            Self::List => OpCode::List,
        }
    }
}

/// A request together with the session id the client sent it under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Session the client claims to belong to.
    pub session_id: SessionId,
    /// The operation itself.
    pub request: Request,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Outcome code sent at the start of every non-terminate response.
///
/// `0` is success; every failure has its own nonzero code so clients can
/// tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum Status {
    /// The operation succeeded.
    Ok = 0,
    /// `create` named an id that is already taken.
    AlreadyExists = 1,
    /// No event has the requested id.
    NotFound = 2,
    /// Rows or columns were zero, or the grid would not fit in memory.
    InvalidDimensions = 3,
    /// A requested seat lies outside the grid.
    OutOfBounds = 4,
    /// A requested seat already holds a reservation.
    AlreadyReserved = 5,
    /// The event cannot issue another reservation id.
    ReservationsExhausted = 6,
}

impl Status {
    /// Returns the wire value.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Maps a wire value back to a status, if it is a known one.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            1 => Some(Self::AlreadyExists),
            2 => Some(Self::NotFound),
            3 => Some(Self::InvalidDimensions),
            4 => Some(Self::OutOfBounds),
            5 => Some(Self::AlreadyReserved),
            6 => Some(Self::ReservationsExhausted),
            _ => None,
        }
    }

    /// Returns `true` for [`Status::Ok`].
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Ok => "ok",
            Self::AlreadyExists => "event already exists",
            Self::NotFound => "event not found",
            Self::InvalidDimensions => "invalid dimensions",
            Self::OutOfBounds => "seat out of bounds",
            Self::AlreadyReserved => "seat already reserved",
            Self::ReservationsExhausted => "reservation ids exhausted",
        };
        f.write_str(text)
    }
}

/// A full snapshot of one event's seats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatMap {
    /// Row count.
    pub rows: usize,
    /// Column count.
    pub cols: usize,
    /// `rows * cols` reservation ids in row-major order.
    pub seats: Vec<ReservationId>,
}

impl SeatMap {
    /// Returns the reservation id at a 1-indexed seat, if it is in bounds.
    pub fn get(&self, seat: Seat) -> Option<ReservationId> {
        if seat.row == 0 || seat.row > self.rows || seat.col == 0 || seat.col > self.cols {
            return None;
        }
        self.seats.get((seat.row - 1) * self.cols + (seat.col - 1)).copied()
    }

    /// Iterates over rows, each a slice of `cols` reservation ids.
    pub fn rows(&self) -> impl Iterator<Item = &[ReservationId]> {
        // `max(1)` keeps `chunks` happy for a malformed zero-column map.
        self.seats.chunks(self.cols.max(1))
    }
}

/// Renders one line per row with seats separated by single spaces.
impl fmt::Display for SeatMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            let mut first = true;
            for seat in row {
                if !first {
                    f.write_str(" ")?;
                }
                write!(f, "{seat}")?;
                first = false;
            }
            f.write_str("\n")?;
        }
        Ok(())
    }
}

/// A server response, as produced by the session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// A bare status: success for `create`/`reserve`, or any failure.
    Status(Status),
    /// Successful `show`.
    SeatMap(SeatMap),
    /// Successful `list`: event ids in creation order.
    EventList(Vec<EventId>),
}

impl Response {
    /// Returns the status code this response starts with.
    pub fn status(&self) -> Status {
        match self {
            Self::Status(status) => *status,
            Self::SeatMap(_) | Self::EventList(_) => Status::Ok,
        }
    }
}
