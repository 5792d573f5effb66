//! The named-pipe client.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use seatforge_protocol::{
    BinaryCodec, Envelope, EventId, ProtocolError, Request, Seat, SeatMap, SessionId,
};
use seatforge_transport::{RegistrationMessage, make_fifo};
use tokio::io::AsyncWriteExt;
use tokio::net::unix::pipe;

use crate::ClientError;

/// A registered session with a Seatforge server.
///
/// Requests are strictly sequential: each method sends one request and
/// waits for its full response before returning.
#[derive(Debug)]
pub struct Client {
    session_id: SessionId,
    requests: pipe::Sender,
    responses: pipe::Receiver,
    request_path: PathBuf,
    response_path: PathBuf,
    codec: BinaryCodec,
}

impl Client {
    /// Creates the client's pipes, registers with the server listening on
    /// `register_pipe`, and waits for a worker to assign a session id.
    ///
    /// Returns once a worker has picked the client up, which may take a
    /// while if every worker is busy.
    pub async fn connect(
        register_pipe: impl AsRef<Path>,
        request_pipe: impl Into<PathBuf>,
        response_pipe: impl Into<PathBuf>,
    ) -> Result<Self, ClientError> {
        let register_pipe = register_pipe.as_ref().to_path_buf();
        let request_path = request_pipe.into();
        let response_path = response_pipe.into();

        let message = RegistrationMessage {
            request_path: request_path.clone(),
            response_path: response_path.clone(),
        }
        .encode()?;

        for path in [&request_path, &response_path] {
            make_fifo(path).map_err(|source| ClientError::Pipe {
                path: path.clone(),
                source,
            })?;
        }

        let registration = open_blocking(register_pipe.clone(), true).await?;
        tokio::task::spawn_blocking(move || {
            let mut registration = registration;
            registration.write_all(&message)
        })
        .await
        .map_err(std::io::Error::other)
        .and_then(|written| written)
        .map_err(|source| ClientError::Pipe {
            path: register_pipe,
            source,
        })?;

        // Same order the worker opens them in: responses, then requests.
        let responses = open_blocking(response_path.clone(), false).await?;
        let mut responses = pipe::Receiver::from_file(responses).map_err(|source| {
            ClientError::Pipe {
                path: response_path.clone(),
                source,
            }
        })?;
        let requests = open_blocking(request_path.clone(), true).await?;
        let requests = pipe::Sender::from_file(requests).map_err(|source| ClientError::Pipe {
            path: request_path.clone(),
            source,
        })?;

        let codec = BinaryCodec;
        let session_id = codec.read_session_id(&mut responses).await?;
        tracing::debug!(session = %session_id, "registered with server");

        Ok(Self {
            session_id,
            requests,
            responses,
            request_path,
            response_path,
            codec,
        })
    }

    /// The id the server assigned to this session.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    async fn send(&mut self, request: Request) -> Result<(), ClientError> {
        let bytes = self.codec.encode_request(&Envelope {
            session_id: self.session_id,
            request,
        });
        self.requests
            .write_all(&bytes)
            .await
            .map_err(ProtocolError::Write)?;
        Ok(())
    }

    async fn status(&mut self) -> Result<(), ClientError> {
        let code = self.codec.read_status(&mut self.responses).await?;
        ClientError::check(code)
    }

    /// Creates a `rows` × `cols` event.
    pub async fn create(&mut self, event_id: EventId, rows: usize, cols: usize) -> Result<(), ClientError> {
        self.send(Request::Create {
            event_id,
            rows,
            cols,
        })
        .await?;
        self.status().await
    }

    /// Reserves every seat in `seats`, or none of them.
    pub async fn reserve(&mut self, event_id: EventId, seats: &[Seat]) -> Result<(), ClientError> {
        self.send(Request::Reserve {
            event_id,
            seats: seats.to_vec(),
        })
        .await?;
        self.status().await
    }

    /// Fetches an event's seat map.
    pub async fn show(&mut self, event_id: EventId) -> Result<SeatMap, ClientError> {
        self.send(Request::Show { event_id }).await?;
        self.status().await?;
        Ok(self.codec.read_seat_map(&mut self.responses).await?)
    }

    /// Lists every event id in creation order.
    pub async fn list(&mut self) -> Result<Vec<EventId>, ClientError> {
        self.send(Request::List).await?;
        self.status().await?;
        Ok(self.codec.read_event_list(&mut self.responses).await?)
    }

    /// Ends the session. The client's pipes are closed and removed.
    pub async fn quit(mut self) -> Result<(), ClientError> {
        self.send(Request::Terminate).await
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        for path in [&self.request_path, &self.response_path] {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::debug!(path = %path.display(), error = %e, "failed to remove client pipe");
            }
        }
    }
}

/// Opens a FIFO end on the blocking pool, waiting for the server to open
/// the other end.
async fn open_blocking(path: PathBuf, write: bool) -> Result<std::fs::File, ClientError> {
    let opened = tokio::task::spawn_blocking({
        let path = path.clone();
        move || {
            std::fs::OpenOptions::new()
                .read(!write)
                .write(write)
                .open(path)
        }
    })
    .await
    .map_err(std::io::Error::other)
    .and_then(|opened| opened);

    opened.map_err(|source| ClientError::Pipe { path, source })
}
