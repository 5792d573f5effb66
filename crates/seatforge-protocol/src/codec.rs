//! Codec trait and the fixed-width binary implementation.
//!
//! A "codec" (coder/decoder) converts between protocol types and raw bytes.
//! The session state machine only needs the server half of that job, which
//! is what the [`Codec`] trait captures. [`BinaryCodec`] additionally
//! offers the client half, used by `seatforge-client` and by tests.
//!
//! # Layout
//!
//! All scalars are little-endian and fixed width:
//!
//! | field | width |
//! |-------|-------|
//! | op code | 1 byte (ASCII digit) |
//! | session id, status | `i32` |
//! | event id, reservation id | `u32` |
//! | rows, cols, seat count, row/col index, event count | `u64` |
//!
//! Requests are `op, session id, fields...`. A reservation's rows and
//! columns travel as two separate arrays of `seat count` entries each.

use std::future::Future;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{
    Envelope, EventId, OpCode, ProtocolError, Request, ReservationId, Response,
    Seat, SeatMap, SessionId,
};

/// The largest number of seats a single reservation may carry.
pub const MAX_RESERVATION_SIZE: usize = 256;

/// Server-side framing of requests and responses.
///
/// ## Trait bounds
///
/// - `Send + Sync + 'static` → one codec value is shared by every worker
///   task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Reads one complete request.
    ///
    /// Returns `Ok(None)` if the channel is closed cleanly before the op
    /// code byte. Any failure after that point, including EOF, is an error:
    /// a request is either read whole or not applied at all.
    fn read_request<R>(
        &self,
        reader: &mut R,
    ) -> impl Future<Output = Result<Option<Envelope>, ProtocolError>> + Send
    where
        R: AsyncRead + Unpin + Send;

    /// Serializes a response into the bytes to write.
    fn encode_response(&self, response: &Response) -> Vec<u8>;

    /// Serializes the session id sent once right after registration.
    fn encode_session_id(&self, session_id: SessionId) -> Vec<u8>;
}

/// The fixed-width little-endian [`Codec`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

impl Codec for BinaryCodec {
    fn read_request<R>(
        &self,
        reader: &mut R,
    ) -> impl Future<Output = Result<Option<Envelope>, ProtocolError>> + Send
    where
        R: AsyncRead + Unpin + Send,
    {
        async move {
            let mut op = [0u8; 1];
            let n = reader.read(&mut op).await.map_err(ProtocolError::Read)?;
            if n == 0 {
                return Ok(None);
            }
            let op = OpCode::try_from(op[0]).map_err(ProtocolError::UnknownOpCode)?;
            let session_id = SessionId(
                reader.read_i32_le().await.map_err(ProtocolError::Read)?,
            );

            let request = match op {
                OpCode::Terminate => Request::Terminate,
                OpCode::Create => {
                    let event_id = read_event_id(reader).await?;
                    let rows = read_size(reader).await?;
                    let cols = read_size(reader).await?;
                    Request::Create {
                        event_id,
                        rows,
                        cols,
                    }
                }
                OpCode::Reserve => {
                    let event_id = read_event_id(reader).await?;
                    let count = reader.read_u64_le().await.map_err(ProtocolError::Read)?;
                    if count > MAX_RESERVATION_SIZE as u64 {
                        return Err(ProtocolError::ReservationTooLarge {
                            requested: count,
                            limit: MAX_RESERVATION_SIZE,
                        });
                    }
                    let count = count as usize;

                    let mut rows = Vec::with_capacity(count);
                    for _ in 0..count {
                        rows.push(read_size(reader).await?);
                    }
                    let mut seats = Vec::with_capacity(count);
                    for row in rows {
                        seats.push(Seat::new(row, read_size(reader).await?));
                    }
                    Request::Reserve { event_id, seats }
                }
                OpCode::Show => Request::Show {
                    event_id: read_event_id(reader).await?,
                },
                OpCode::List => Request::List,
            };

            Ok(Some(Envelope {
                session_id,
                request,
            }))
        }
    }

    fn encode_response(&self, response: &Response) -> Vec<u8> {
        let mut buf = Vec::new();
        put_i32(&mut buf, response.status().code());
        match response {
            Response::Status(_) => {}
            Response::SeatMap(map) => {
                buf.reserve(16 + map.seats.len() * 4);
                put_size(&mut buf, map.rows);
                put_size(&mut buf, map.cols);
                for seat in &map.seats {
                    put_u32(&mut buf, *seat);
                }
            }
            Response::EventList(ids) => {
                buf.reserve(8 + ids.len() * 4);
                put_size(&mut buf, ids.len());
                for id in ids {
                    put_u32(&mut buf, id.0);
                }
            }
        }
        buf
    }

    fn encode_session_id(&self, session_id: SessionId) -> Vec<u8> {
        session_id.0.to_le_bytes().to_vec()
    }
}

// ---------------------------------------------------------------------------
// Client half
// ---------------------------------------------------------------------------

impl BinaryCodec {
    /// Serializes a request for the request channel.
    pub fn encode_request(&self, envelope: &Envelope) -> Vec<u8> {
        let mut buf = vec![envelope.request.op_code().as_byte()];
        put_i32(&mut buf, envelope.session_id.0);
        match &envelope.request {
            Request::Terminate | Request::List => {}
            Request::Create {
                event_id,
                rows,
                cols,
            } => {
                put_u32(&mut buf, event_id.0);
                put_size(&mut buf, *rows);
                put_size(&mut buf, *cols);
            }
            Request::Reserve { event_id, seats } => {
                put_u32(&mut buf, event_id.0);
                put_size(&mut buf, seats.len());
                for seat in seats {
                    put_size(&mut buf, seat.row);
                }
                for seat in seats {
                    put_size(&mut buf, seat.col);
                }
            }
            Request::Show { event_id } => put_u32(&mut buf, event_id.0),
        }
        buf
    }

    /// Reads the session id the server sends after registration.
    pub async fn read_session_id<R>(&self, reader: &mut R) -> Result<SessionId, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        Ok(SessionId(
            reader.read_i32_le().await.map_err(ProtocolError::Read)?,
        ))
    }

    /// Reads the raw status code that opens a response.
    ///
    /// Returned as the raw `i32` so clients can surface codes this build
    /// does not know; see [`crate::Status::from_code`].
    pub async fn read_status<R>(&self, reader: &mut R) -> Result<i32, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        reader.read_i32_le().await.map_err(ProtocolError::Read)
    }

    /// Reads the body of a successful `show` response.
    pub async fn read_seat_map<R>(&self, reader: &mut R) -> Result<SeatMap, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        let rows = read_size(reader).await?;
        let cols = read_size(reader).await?;
        let cells = rows
            .checked_mul(cols)
            .ok_or_else(|| ProtocolError::InvalidMessage(format!("{rows}x{cols} grid overflows")))?;

        let mut seats: Vec<ReservationId> = Vec::with_capacity(cells.min(1024));
        for _ in 0..cells {
            seats.push(reader.read_u32_le().await.map_err(ProtocolError::Read)?);
        }
        Ok(SeatMap { rows, cols, seats })
    }

    /// Reads the body of a successful `list` response.
    pub async fn read_event_list<R>(&self, reader: &mut R) -> Result<Vec<EventId>, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        let count = read_size(reader).await?;
        let mut ids = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            ids.push(EventId(
                reader.read_u32_le().await.map_err(ProtocolError::Read)?,
            ));
        }
        Ok(ids)
    }
}

// ---------------------------------------------------------------------------
// Scalar helpers
// ---------------------------------------------------------------------------

async fn read_event_id<R>(reader: &mut R) -> Result<EventId, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    Ok(EventId(
        reader.read_u32_le().await.map_err(ProtocolError::Read)?,
    ))
}

async fn read_size<R>(reader: &mut R) -> Result<usize, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let raw = reader.read_u64_le().await.map_err(ProtocolError::Read)?;
    usize::try_from(raw).map_err(|_| ProtocolError::SizeOverflow(raw))
}

fn put_i32(buf: &mut Vec<u8>, value: i32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn put_size(buf: &mut Vec<u8>, value: usize) {
    buf.extend_from_slice(&(value as u64).to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Status;

    fn envelope(request: Request) -> Envelope {
        Envelope {
            session_id: SessionId(4),
            request,
        }
    }

    async fn decode(bytes: &[u8]) -> Result<Option<Envelope>, ProtocolError> {
        let mut reader = bytes;
        BinaryCodec.read_request(&mut reader).await
    }

    #[test]
    fn test_create_request_layout() {
        let bytes = BinaryCodec.encode_request(&envelope(Request::Create {
            event_id: EventId(7),
            rows: 2,
            cols: 3,
        }));
        assert_eq!(bytes.len(), 1 + 4 + 4 + 8 + 8);
        assert_eq!(bytes[0], b'3');
        assert_eq!(&bytes[1..5], &4i32.to_le_bytes());
        assert_eq!(&bytes[5..9], &7u32.to_le_bytes());
        assert_eq!(&bytes[9..17], &2u64.to_le_bytes());
        assert_eq!(&bytes[17..25], &3u64.to_le_bytes());
    }

    #[test]
    fn test_reserve_request_sends_rows_then_cols() {
        let bytes = BinaryCodec.encode_request(&envelope(Request::Reserve {
            event_id: EventId(1),
            seats: vec![Seat::new(1, 5), Seat::new(2, 6)],
        }));
        let body = &bytes[9..];
        assert_eq!(&body[0..8], &2u64.to_le_bytes());
        assert_eq!(&body[8..16], &1u64.to_le_bytes());
        assert_eq!(&body[16..24], &2u64.to_le_bytes());
        assert_eq!(&body[24..32], &5u64.to_le_bytes());
        assert_eq!(&body[32..40], &6u64.to_le_bytes());
    }

    #[tokio::test]
    async fn test_decode_reads_what_client_encodes() {
        let requests = [
            Request::Terminate,
            Request::List,
            Request::Show { event_id: EventId(9) },
            Request::Reserve {
                event_id: EventId(2),
                seats: vec![Seat::new(1, 1), Seat::new(3, 4)],
            },
        ];
        for request in requests {
            let env = envelope(request);
            let bytes = BinaryCodec.encode_request(&env);
            assert_eq!(decode(&bytes).await.unwrap(), Some(env));
        }
    }

    #[tokio::test]
    async fn test_decode_clean_eof_is_none() {
        assert_eq!(decode(&[]).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_decode_unknown_op_code() {
        let err = decode(&[b'9', 0, 0, 0, 0]).await.unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownOpCode(b'9')));
    }

    #[tokio::test]
    async fn test_decode_truncated_request_is_error() {
        let bytes = BinaryCodec.encode_request(&envelope(Request::Create {
            event_id: EventId(7),
            rows: 2,
            cols: 3,
        }));
        let err = decode(&bytes[..bytes.len() - 3]).await.unwrap_err();
        assert!(err.is_truncated());
    }

    #[tokio::test]
    async fn test_decode_rejects_oversized_reservation() {
        let mut bytes = vec![b'4'];
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&((MAX_RESERVATION_SIZE as u64) + 1).to_le_bytes());
        let err = decode(&bytes).await.unwrap_err();
        assert!(matches!(err, ProtocolError::ReservationTooLarge { .. }));
    }

    #[test]
    fn test_failure_response_is_status_only() {
        let bytes = BinaryCodec.encode_response(&Response::Status(Status::NotFound));
        assert_eq!(bytes, 2i32.to_le_bytes().to_vec());
    }

    #[tokio::test]
    async fn test_seat_map_response_layout() {
        let map = SeatMap {
            rows: 2,
            cols: 3,
            seats: vec![1, 1, 0, 0, 0, 0],
        };
        let bytes = BinaryCodec.encode_response(&Response::SeatMap(map.clone()));
        assert_eq!(bytes.len(), 4 + 8 + 8 + 6 * 4);

        let mut reader = bytes.as_slice();
        assert_eq!(BinaryCodec.read_status(&mut reader).await.unwrap(), 0);
        assert_eq!(BinaryCodec.read_seat_map(&mut reader).await.unwrap(), map);
        assert!(reader.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_seat_map_header_is_truncated_not_allocated() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(1u64 << 20).to_le_bytes());
        bytes.extend_from_slice(&(1u64 << 20).to_le_bytes());
        bytes.extend_from_slice(&7u32.to_le_bytes());

        let mut reader = bytes.as_slice();
        let err = BinaryCodec.read_seat_map(&mut reader).await.unwrap_err();
        assert!(err.is_truncated());
    }

    #[tokio::test]
    async fn test_event_list_response_layout() {
        let ids = vec![EventId(3), EventId(1), EventId(4)];
        let bytes = BinaryCodec.encode_response(&Response::EventList(ids.clone()));

        let mut reader = bytes.as_slice();
        assert_eq!(BinaryCodec.read_status(&mut reader).await.unwrap(), 0);
        assert_eq!(BinaryCodec.read_event_list(&mut reader).await.unwrap(), ids);
    }

    #[tokio::test]
    async fn test_session_id_layout() {
        let bytes = BinaryCodec.encode_session_id(SessionId(-2));
        let mut reader = bytes.as_slice();
        assert_eq!(
            BinaryCodec.read_session_id(&mut reader).await.unwrap(),
            SessionId(-2)
        );
    }
}
