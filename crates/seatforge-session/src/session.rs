//! The per-client request loop.
//!
//! A session is deliberately simple: the client sends one request, waits
//! for its response, and only then sends the next. The server never reads
//! ahead, so a session needs no buffering beyond a single request.

use seatforge_protocol::{Codec, Envelope, ProtocolError, Request, Response, SessionId, Status};
use seatforge_store::EventStore;
use seatforge_transport::ClientChannels;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::SessionError;

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where a session is in its lifecycle.
///
/// ```text
///   AwaitOpcode ──(request)──→ AwaitOpcode   (one response written)
///       │
///       └──(terminate, EOF, or malformed input)──→ Closed
/// ```
///
/// There is no intermediate state: a request is read whole before the
/// store is touched, so a session is either waiting for the next op code
/// or finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the next request's op code byte.
    AwaitOpcode,
    /// Finished. Nothing more is read or written.
    Closed,
}

/// What a finished session did, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// The session's id.
    pub session_id: SessionId,
    /// Number of requests answered. `terminate` is not counted.
    pub requests: u64,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One client's conversation with the server.
///
/// Owns both ends of the client's channels: `reader` is the request
/// channel, `writer` the response channel.
#[derive(Debug)]
pub struct Session<R, W> {
    id: SessionId,
    reader: R,
    writer: W,
    state: SessionState,
    requests: u64,
}

impl<R, W> Session<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Wraps a client's open channels.
    pub fn new(id: SessionId, reader: R, writer: W) -> Self {
        Self {
            id,
            reader,
            writer,
            state: SessionState::AwaitOpcode,
            requests: 0,
        }
    }

    /// The session's id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Sends the session id, then serves requests until the session closes.
    ///
    /// Returns `Ok` only if the client sent `terminate`. Every other way a
    /// session can end is an error; either way both channels are dropped
    /// on return.
    pub async fn run<C: Codec>(
        mut self,
        store: &EventStore,
        codec: &C,
    ) -> Result<SessionSummary, SessionError> {
        let greeting = codec.encode_session_id(self.id);
        self.write(&greeting).await?;

        while self.state == SessionState::AwaitOpcode {
            if let Err(err) = self.handle_next(store, codec).await {
                self.state = SessionState::Closed;
                return Err(err);
            }
        }

        Ok(SessionSummary {
            session_id: self.id,
            requests: self.requests,
        })
    }

    /// Reads one request, applies it, and writes its response.
    pub async fn handle_next<C: Codec>(
        &mut self,
        store: &EventStore,
        codec: &C,
    ) -> Result<SessionState, SessionError> {
        let Envelope {
            session_id,
            request,
        } = codec
            .read_request(&mut self.reader)
            .await?
            .ok_or(SessionError::Disconnected)?;

        if session_id != self.id {
            return Err(SessionError::SessionIdMismatch {
                expected: self.id,
                got: session_id,
            });
        }

        let Some(response) = apply(store, request).await else {
            tracing::debug!(session = %self.id, "terminate received");
            self.state = SessionState::Closed;
            return Ok(self.state);
        };

        if !response.status().is_ok() {
            tracing::debug!(session = %self.id, status = %response.status(), "request rejected");
        }
        let bytes = codec.encode_response(&response);
        self.write(&bytes).await?;
        self.requests += 1;
        Ok(self.state)
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        self.writer
            .write_all(bytes)
            .await
            .map_err(ProtocolError::Write)?;
        self.writer.flush().await.map_err(ProtocolError::Write)
    }
}

/// Runs one request against the store. `None` means `terminate`.
async fn apply(store: &EventStore, request: Request) -> Option<Response> {
    let response = match request {
        Request::Terminate => return None,
        Request::Create {
            event_id,
            rows,
            cols,
        } => match store.create(event_id, rows, cols).await {
            Ok(()) => Response::Status(Status::Ok),
            Err(err) => Response::Status(err.status()),
        },
        Request::Reserve { event_id, seats } => match store.reserve(event_id, &seats).await {
            Ok(_) => Response::Status(Status::Ok),
            Err(err) => Response::Status(err.status()),
        },
        Request::Show { event_id } => match store.show(event_id).await {
            Ok(map) => Response::SeatMap(map),
            Err(err) => Response::Status(err.status()),
        },
        Request::List => Response::EventList(store.list().await),
    };
    Some(response)
}

/// Opens a registered client's channels and runs its session to the end.
///
/// This is the whole of a worker's job for one client.
pub async fn serve<T, C>(
    id: SessionId,
    channels: T,
    store: &EventStore,
    codec: &C,
) -> Result<SessionSummary, SessionError>
where
    T: ClientChannels,
    C: Codec,
{
    let (reader, writer) = channels.open().await?;
    Session::new(id, reader, writer).run(store, codec).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use seatforge_protocol::{BinaryCodec, EventId, Seat};
    use tokio::io::{AsyncWriteExt, DuplexStream};
    use tokio::task::JoinHandle;

    use super::*;

    const ID: SessionId = SessionId(5);

    struct Client {
        requests: DuplexStream,
        responses: DuplexStream,
        task: JoinHandle<Result<SessionSummary, SessionError>>,
    }

    impl Client {
        async fn send(&mut self, request: Request) {
            let bytes = BinaryCodec.encode_request(&Envelope {
                session_id: ID,
                request,
            });
            self.requests.write_all(&bytes).await.unwrap();
        }

        async fn status(&mut self) -> i32 {
            BinaryCodec.read_status(&mut self.responses).await.unwrap()
        }
    }

    async fn start(store: Arc<EventStore>) -> Client {
        let (requests, server_reader) = tokio::io::duplex(4096);
        let (server_writer, mut responses) = tokio::io::duplex(4096);
        let task = tokio::spawn(async move {
            Session::new(ID, server_reader, server_writer)
                .run(&store, &BinaryCodec)
                .await
        });

        let greeting = BinaryCodec.read_session_id(&mut responses).await.unwrap();
        assert_eq!(greeting, ID);
        Client {
            requests,
            responses,
            task,
        }
    }

    #[tokio::test]
    async fn test_create_reserve_show_then_terminate() {
        let store = Arc::new(EventStore::default());
        let mut client = start(Arc::clone(&store)).await;

        client
            .send(Request::Create {
                event_id: EventId(7),
                rows: 2,
                cols: 3,
            })
            .await;
        assert_eq!(client.status().await, 0);

        client
            .send(Request::Reserve {
                event_id: EventId(7),
                seats: vec![Seat::new(1, 1), Seat::new(1, 2)],
            })
            .await;
        assert_eq!(client.status().await, 0);

        client.send(Request::Show { event_id: EventId(7) }).await;
        assert_eq!(client.status().await, 0);
        let map = BinaryCodec.read_seat_map(&mut client.responses).await.unwrap();
        assert_eq!(map.seats, vec![1, 1, 0, 0, 0, 0]);

        client.send(Request::Terminate).await;
        let summary = client.task.await.unwrap().unwrap();
        assert_eq!(summary, SessionSummary { session_id: ID, requests: 3 });
    }

    #[tokio::test]
    async fn test_failure_status_keeps_session_open() {
        let store = Arc::new(EventStore::default());
        let mut client = start(store).await;

        client.send(Request::Show { event_id: EventId(9) }).await;
        assert_eq!(client.status().await, Status::NotFound.code());

        client.send(Request::List).await;
        assert_eq!(client.status().await, 0);
        let ids = BinaryCodec.read_event_list(&mut client.responses).await.unwrap();
        assert!(ids.is_empty());

        client.send(Request::Terminate).await;
        assert!(client.task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_terminate_sends_no_response() {
        let store = Arc::new(EventStore::default());
        let mut client = start(store).await;

        client.send(Request::Terminate).await;
        assert!(client.task.await.unwrap().is_ok());

        // Server side is dropped; the response channel ends with no bytes.
        let mut rest = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut client.responses, &mut rest)
            .await
            .unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_op_code_closes_session() {
        let store = Arc::new(EventStore::default());
        let mut client = start(store).await;

        client.requests.write_all(b"9").await.unwrap();
        let err = client.task.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            SessionError::Protocol(ProtocolError::UnknownOpCode(b'9'))
        ));
    }

    #[tokio::test]
    async fn test_session_id_mismatch_closes_session() {
        let store = Arc::new(EventStore::default());
        let mut client = start(Arc::clone(&store)).await;

        let bytes = BinaryCodec.encode_request(&Envelope {
            session_id: SessionId(6),
            request: Request::Create {
                event_id: EventId(1),
                rows: 1,
                cols: 1,
            },
        });
        client.requests.write_all(&bytes).await.unwrap();

        let err = client.task.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            SessionError::SessionIdMismatch {
                expected: ID,
                got: SessionId(6)
            }
        ));
        // The mismatched request was never applied.
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_eof_without_terminate_is_disconnect() {
        let store = Arc::new(EventStore::default());
        let client = start(store).await;

        drop(client.requests);
        let err = client.task.await.unwrap().unwrap_err();
        assert!(matches!(err, SessionError::Disconnected));
    }

    #[tokio::test]
    async fn test_truncated_request_is_not_applied() {
        let store = Arc::new(EventStore::default());
        let mut client = start(Arc::clone(&store)).await;

        let bytes = BinaryCodec.encode_request(&Envelope {
            session_id: ID,
            request: Request::Create {
                event_id: EventId(1),
                rows: 1,
                cols: 1,
            },
        });
        client.requests.write_all(&bytes[..bytes.len() - 3]).await.unwrap();
        drop(client.requests);

        match client.task.await.unwrap().unwrap_err() {
            SessionError::Protocol(err) => assert!(err.is_truncated()),
            other => panic!("expected truncated read, got {other:?}"),
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_handle_next_reports_state() {
        let store = EventStore::default();
        let (mut requests, server_reader) = tokio::io::duplex(4096);
        let (server_writer, _responses) = tokio::io::duplex(4096);
        let mut session = Session::new(ID, server_reader, server_writer);
        assert_eq!(session.state(), SessionState::AwaitOpcode);

        for request in [Request::List, Request::Terminate] {
            let bytes = BinaryCodec.encode_request(&Envelope {
                session_id: ID,
                request,
            });
            requests.write_all(&bytes).await.unwrap();
        }

        assert_eq!(
            session.handle_next(&store, &BinaryCodec).await.unwrap(),
            SessionState::AwaitOpcode
        );
        assert_eq!(
            session.handle_next(&store, &BinaryCodec).await.unwrap(),
            SessionState::Closed
        );
        assert_eq!(session.id(), ID);
    }
}
